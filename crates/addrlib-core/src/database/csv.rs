//! Textual (CSV) Address Library ingestion
//!
//! ```text
//! id,offset              <- column header, ignored
//! 12345,1.6.1170.0       <- entry count, version label
//! 1,0x1000               <- one mapping per line
//! # comment
//! ```
//!
//! Bad data lines are skipped with a warning; only a file with no usable
//! mapping at all fails the load.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::database::store::Record;
use crate::error::{Error, Result};
use crate::version::Version;

/// Counters collected while parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvStats {
    /// Unique ids accepted
    pub valid: usize,
    /// Malformed data lines skipped
    pub invalid: usize,
    /// Lines that overwrote an earlier id
    pub duplicates: usize,
    /// Entry count declared by the metadata line, if it parsed
    pub expected: Option<usize>,
    /// Version label from the metadata line, if it parsed
    pub version_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CsvDatabase {
    /// Ascending by id, ids unique
    pub records: Vec<Record>,
    pub stats: CsvStats,
}

/// Parse a decimal or `0x`-prefixed hexadecimal number.
pub fn parse_number(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_metadata(line: &str, line_number: usize, stats: &mut CsvStats) {
    let Some((count, label)) = line.split_once(',') else {
        warn!(
            "CSV metadata line {}: Invalid format (missing comma). Line: '{}'",
            line_number, line
        );
        return;
    };

    match parse_number(count.trim()) {
        Some(expected) => {
            let label = label.trim().to_string();
            info!(
                "CSV Address Library metadata: expected entries = {}, version = {}",
                expected, label
            );
            stats.expected = usize::try_from(expected).ok().filter(|&n| n > 0);
            stats.version_label = Some(label);
        }
        None => warn!(
            "CSV metadata line {}: Could not parse entry count or version string. Line: '{}'",
            line_number, line
        ),
    }
}

/// Parse a CSV database from `reader`. `path` is only used for diagnostics.
pub fn parse_csv<R: BufRead>(reader: R, path: &Path) -> Result<CsvDatabase> {
    let mut stats = CsvStats::default();
    let mut records: Vec<Record> = Vec::new();
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for (index, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches('\r');
        let line_number = index + 1;

        match line_number {
            1 => continue,
            2 => {
                parse_metadata(line, line_number, &mut stats);
                continue;
            }
            _ => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((id_str, offset_str)) = trimmed.split_once(',') else {
            warn!(
                "CSV line {}: Invalid format (missing comma). Line: '{}'",
                line_number, line
            );
            stats.invalid += 1;
            continue;
        };

        let (id_str, offset_str) = (id_str.trim(), offset_str.trim());
        if id_str.is_empty() || offset_str.is_empty() {
            warn!(
                "CSV line {}: Empty ID or offset value. Line: '{}'",
                line_number, line
            );
            stats.invalid += 1;
            continue;
        }

        let (Some(id), Some(offset)) = (parse_number(id_str), parse_number(offset_str)) else {
            warn!(
                "CSV line {}: Invalid number format. Line: '{}'",
                line_number, line
            );
            stats.invalid += 1;
            continue;
        };

        match positions.get(&id) {
            Some(&pos) => {
                warn!(
                    "CSV line {}: Duplicate ID {} (previous offset: 0x{:X}, new offset: 0x{:X})",
                    line_number, id, records[pos].offset, offset
                );
                records[pos].offset = offset;
                stats.duplicates += 1;
            }
            None => {
                positions.insert(id, records.len());
                records.push(Record { id, offset });
                stats.valid += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(Error::EmptyDatabase {
            path: path.to_path_buf(),
        });
    }

    records.sort_unstable_by_key(|r| r.id);

    info!(
        "CSV Address Library parsed: {} valid, {} unique",
        stats.valid,
        records.len()
    );
    if stats.invalid > 0 {
        warn!("  - Invalid entries: {}", stats.invalid);
    }
    if stats.duplicates > 0 {
        warn!(
            "  - Duplicate entries: {} (latest values used)",
            stats.duplicates
        );
    }
    if let Some(expected) = stats.expected.filter(|&n| n != records.len()) {
        warn!(
            "CSV entry count mismatch: metadata = {}, actual = {}",
            expected,
            records.len()
        );
    }

    Ok(CsvDatabase { records, stats })
}

/// Open and parse a CSV database file.
pub fn read_csv(path: &Path) -> Result<CsvDatabase> {
    let file = File::open(path).map_err(|source| Error::FileNotOpenable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(BufReader::new(file), path)
}

/// Write records in the format [`parse_csv`] reads.
pub fn write_csv<W: Write>(w: &mut W, version: Version, records: &[Record]) -> Result<()> {
    writeln!(w, "id,offset")?;
    writeln!(w, "{},{}", records.len(), version)?;
    for record in records {
        writeln!(w, "{},0x{:X}", record.id, record.offset)?;
    }
    Ok(())
}
