//! Lookup command implementation.

use std::path::Path;

use addrlib_core::AddressDatabase;
use anyhow::{Result, bail};
use tracing::warn;

use super::Context;
use super::hex_utils::format_hex_address;
use super::source;

/// One output line for `id`: id, offset and, with a base, the absolute address
pub fn format_entry(
    db: &AddressDatabase,
    id: u64,
    base: Option<u64>,
) -> addrlib_core::Result<String> {
    let offset = db.offset(id)?;
    Ok(match base {
        Some(base) => format!(
            "{}\t{}\t{}",
            id,
            format_hex_address(offset),
            format_hex_address(base.wrapping_add(offset))
        ),
        None => format!("{}\t{}", id, format_hex_address(offset)),
    })
}

/// Run the lookup command
pub fn run(ctx: &Context<'_>, ids: &[u64], file: Option<&Path>, base: Option<u64>) -> Result<()> {
    let db = source::open(ctx, file)?;

    let mut missing = 0;
    for &id in ids {
        match format_entry(&db, id, base) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                warn!("{}", e);
                println!("{}\tnot found", id);
                missing += 1;
            }
        }
    }

    if missing > 0 {
        bail!("{} of {} ids not found", missing, ids.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::reverse::format_offset;
    use addrlib_core::{DatabaseConfig, Record, SharedCache, Version, write_csv};

    #[test]
    fn test_lookup_and_reverse_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versionlib-1-6-1170-0.csv");
        let records = [
            Record {
                id: 7,
                offset: 0x100,
            },
            Record {
                id: 9,
                offset: 0x180,
            },
        ];
        let mut bytes = Vec::new();
        write_csv(&mut bytes, Version::new(1, 6, 1170, 0), &records).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let cache = SharedCache::new();
        let ctx = Context::new(DatabaseConfig::default(), None, &cache);
        let db = source::open(&ctx, Some(&path)).unwrap();

        assert_eq!(format_entry(&db, 7, None).unwrap(), "7\t0x100");
        assert_eq!(
            format_entry(&db, 9, Some(0x1_4000_0000)).unwrap(),
            "9\t0x180\t0x140000180"
        );
        assert!(format_entry(&db, 8, None).is_err());

        let index = db.offset_index();
        assert_eq!(format_offset(&index, 0x180), "0x180\t9");
        assert_eq!(format_offset(&index, 0x188), "0x188\t9+0x8");
        assert_eq!(format_offset(&index, 0x10), "0x10\tnot found");
    }
}
