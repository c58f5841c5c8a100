//! Locate command implementation.

use anyhow::Result;

use super::Context;
use super::source;

/// Run the locate command
pub fn run(ctx: &Context<'_>) -> Result<()> {
    let (found, version) = source::discover(ctx)?;
    println!("Game version: {}", version);
    println!("File:         {}", found.path.display());
    println!("Kind:         {:?}", found.kind);
    if let Some(format) = found.kind.implied_format() {
        println!("Format:       {}", format);
    }
    Ok(())
}
