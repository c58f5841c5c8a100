//! Convert command implementation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use addrlib_core::{
    AddressDatabase, Format, write_compressed, write_csv, write_dense, write_legacy,
};
use anyhow::{Context as _, Result};
use tracing::info;

use super::Context;
use super::source;

pub struct ConvertArgs<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub to: Format,
    /// Header name override for v2/v5 output
    pub name: Option<&'a str>,
    pub pointer_size: u64,
}

/// Write every record of `db` to `w` in `args.to`. Returns the record count.
pub fn write_database<W: Write>(db: &AddressDatabase, args: &ConvertArgs<'_>, w: &mut W) -> Result<usize> {
    let records = db.records();
    let name = args.name.unwrap_or(db.name());

    match args.to {
        Format::Legacy => write_legacy(w, &records)?,
        Format::Compressed => write_compressed(w, db.version(), name, args.pointer_size, &records)?,
        Format::Dense => write_dense(w, db.version(), name, args.pointer_size, &records)?,
        Format::Csv => write_csv(w, db.version(), &records)?,
    }
    Ok(records.len())
}

/// Run the convert command
pub fn run(ctx: &Context<'_>, args: &ConvertArgs<'_>) -> Result<()> {
    let db = source::open(ctx, Some(args.input))?;

    let file = File::create(args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    let count = write_database(&db, args, &mut writer)?;
    writer.flush()?;

    info!(
        "Wrote {} records from {} ({}) to {} ({})",
        count,
        args.input.display(),
        db.format(),
        args.output.display(),
        args.to
    );
    Ok(())
}
