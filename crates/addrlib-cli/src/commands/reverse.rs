//! Reverse lookup command implementation.

use std::path::Path;

use addrlib_core::OffsetIndex;
use anyhow::Result;

use super::Context;
use super::hex_utils::format_hex_address;
use super::source;

/// Describe `offset`: the exact id, or the nearest mapped id below it
pub fn format_offset(index: &OffsetIndex, offset: u64) -> String {
    if let Some(id) = index.id_for(offset) {
        return format!("{}\t{}", format_hex_address(offset), id);
    }
    match index.containing(offset) {
        Some(record) => format!(
            "{}\t{}+{}",
            format_hex_address(offset),
            record.id,
            format_hex_address(offset - record.offset)
        ),
        None => format!("{}\tnot found", format_hex_address(offset)),
    }
}

/// Run the reverse command
pub fn run(ctx: &Context<'_>, offsets: &[u64], file: Option<&Path>) -> Result<()> {
    let db = source::open(ctx, file)?;
    let index = db.offset_index();
    for &offset in offsets {
        println!("{}", format_offset(&index, offset));
    }
    Ok(())
}
