mod cli;
mod commands;
mod settings;

use addrlib_core::SharedCache;
use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::Context;

fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("addrlib=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = settings::resolve(cli.config.as_deref(), &cli.overrides())?;
    debug!("Effective configuration: {:?}", config);

    let ctx =
        Context::new(config, cli.game_version, SharedCache::global()).with_legacy(cli.legacy);

    match cli.command {
        Command::Info { file } => commands::info::run(&ctx, file.as_deref()),
        Command::Lookup { ids, file } => commands::lookup::run(&ctx, &ids, file.as_deref(), cli.base),
        Command::Reverse { offsets, file } => {
            commands::reverse::run(&ctx, &offsets, file.as_deref())
        }
        Command::Convert {
            input,
            output,
            to,
            name,
            pointer_size,
        } => commands::convert::run(
            &ctx,
            &commands::convert::ConvertArgs {
                input: &input,
                output: &output,
                to,
                name: name.as_deref(),
                pointer_size,
            },
        ),
        Command::Locate => commands::locate::run(&ctx),
    }
}
