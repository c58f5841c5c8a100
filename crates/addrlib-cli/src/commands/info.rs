//! Info command implementation.

use std::path::Path;

use addrlib_core::{AddressDatabase, content_hash};
use anyhow::Result;

use super::Context;
use super::source;

/// Summary lines for a loaded database
pub fn describe(db: &AddressDatabase) -> Vec<String> {
    let region = db.store().region();
    let mut lines = vec![
        format!("File:         {}", db.path().display()),
        format!("Format:       {}", db.format()),
        format!("Game version: {}", db.version()),
    ];
    if !db.name().is_empty() {
        lines.push(format!("Name:         {}", db.name()));
    }
    lines.push(format!("Pointer size: {}", db.pointer_size()));
    lines.push(format!("Entries:      {}", db.len()));

    let records = db.records();
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        lines.push(format!("Id range:     {}..={}", first.id, last.id));
        lines.push(format!("Mapped ids:   {}", records.len()));
    }

    lines.push(format!(
        "Region:       {} ({} bytes, {})",
        region.name(),
        region.len(),
        if region.is_mapped() { "mapped" } else { "decoded" }
    ));
    lines.push(format!("SHA-512:      {}", content_hash(region.as_bytes())));
    lines
}

/// Run the info command
pub fn run(ctx: &Context<'_>, file: Option<&Path>) -> Result<()> {
    let db = source::open(ctx, file)?;
    for line in describe(&db) {
        println!("{}", line);
    }
    Ok(())
}
