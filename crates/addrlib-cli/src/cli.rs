use std::path::PathBuf;

use addrlib_core::{Format, Loader, Version};
use clap::{Parser, Subcommand};

use crate::commands::hex_utils::{parse_hex_address, parse_id};
use crate::settings::Overrides;

#[derive(Parser)]
#[command(name = "addrlib", about = "Address Library inspection tool", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file
    #[arg(long, global = true, env = "ADDRLIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host executable version, e.g. 1.6.1170.0
    #[arg(long, global = true)]
    pub game_version: Option<Version>,

    /// Script extender loader (SKSE, F4SE, SFSE, OBSE)
    #[arg(long, global = true)]
    pub loader: Option<Loader>,

    /// Directory searched for database files
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Image base in hex, to print absolute addresses
    #[arg(long, global = true, value_parser = parse_hex_address)]
    pub base: Option<u64>,

    /// Skip the known-bad snapshot check
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Read explicit .bin files as the headerless legacy (v0) layout
    #[arg(long, global = true)]
    pub legacy: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            loader: self.loader,
            search_dir: self.dir.clone(),
            no_verify: self.no_verify,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the header, format and entry count of a database
    Info {
        /// Database file; located from --loader and --game-version if omitted
        file: Option<PathBuf>,
    },

    /// Resolve ids to offsets
    Lookup {
        /// Ids, decimal or 0x-prefixed hex
        #[arg(required = true, value_parser = parse_id)]
        ids: Vec<u64>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Find the ids mapped to offsets
    Reverse {
        /// Offsets in hex
        #[arg(required = true, value_parser = parse_hex_address)]
        offsets: Vec<u64>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Rewrite a database in another format
    Convert {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Target format (legacy, v2, v5, csv)
        #[arg(long)]
        to: Format,

        /// Name stored in v2/v5 headers; defaults to the input's name
        #[arg(long)]
        name: Option<String>,

        /// Pointer size stored in v2/v5 headers
        #[arg(long, default_value_t = 8)]
        pointer_size: u64,
    },

    /// Print which file would be loaded
    Locate,
}
