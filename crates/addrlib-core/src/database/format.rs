//! Address Library file formats and their header readers/writers.

use std::io::{self, Read, Write};

use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::database::codec::DeltaEncoder;
use crate::database::layout::{compressed, dense};
use crate::database::store::{Record, StoreLayout};
use crate::database::stream::StreamReader;
use crate::error::{Error, Result};
use crate::version::Version;

/// How a database file is laid out. Fixed for the lifetime of a loaded database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum Format {
    /// v0: count-prefixed sorted records, mapped as is
    #[strum(to_string = "legacy", serialize = "v0")]
    Legacy,
    /// v1/v2: delta-compressed records decoded into a shared region
    #[strum(to_string = "v2", serialize = "v1")]
    Compressed,
    /// v5: fixed header followed by a dense `u32` offset table, mapped as is
    #[strum(serialize = "v5")]
    Dense,
    /// Text fallback, parsed into a shared region
    #[strum(serialize = "csv")]
    Csv,
}

impl Format {
    /// Interpret the leading tag of a self-describing binary file.
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            1 | 2 => Ok(Format::Compressed),
            5 => Ok(Format::Dense),
            other => Err(Error::UnsupportedFormat {
                tag: i64::from(other),
                path: None,
            }),
        }
    }

    pub fn layout(&self) -> StoreLayout {
        match self {
            Format::Legacy | Format::Compressed | Format::Csv => StoreLayout::Sorted,
            Format::Dense => StoreLayout::Dense,
        }
    }

    /// Whether the file itself becomes the region, without decoding
    pub fn is_mapped(&self) -> bool {
        matches!(self, Format::Legacy | Format::Dense)
    }
}

/// Parsed database header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    /// Raw tag for self-describing binaries
    pub tag: Option<u32>,
    /// Target binary version; legacy files carry none
    pub game_version: Option<Version>,
    pub name: String,
    pub pointer_size: u64,
    pub data_format: Option<i32>,
    /// Records (sorted layouts) or dense slots
    pub count: usize,
}

fn header_error(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::malformed(0, "header truncated")
    } else {
        Error::Io(err)
    }
}

fn non_negative(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::malformed(0, format!("negative {field}: {value}")))
}

fn read_version<R: Read>(stream: &mut StreamReader<R>) -> io::Result<Version> {
    let mut fields = [0u32; 4];
    for field in &mut fields {
        *field = stream.read_u32()?;
    }
    Ok(Version::from_header_fields(fields))
}

fn name_from_bytes(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

impl Header {
    /// Read the format tag and the header of a self-describing binary file.
    pub fn read_binary<R: Read>(stream: &mut StreamReader<R>) -> Result<Self> {
        let tag = stream.read_u32().map_err(header_error)?;
        match Format::from_tag(tag)? {
            Format::Compressed => Self::read_compressed(stream, tag),
            Format::Dense => Self::read_dense(stream, tag),
            Format::Legacy | Format::Csv => unreachable!("from_tag only yields binary formats"),
        }
    }

    /// v1/v2 header, positioned after the tag.
    pub fn read_compressed<R: Read>(stream: &mut StreamReader<R>, tag: u32) -> Result<Self> {
        let game_version = read_version(stream).map_err(header_error)?;

        let name_len = stream.read_u32().map_err(header_error)? as usize;
        if name_len > compressed::MAX_NAME_LEN {
            return Err(Error::malformed(
                0,
                format!("database name length {name_len} exceeds {}", compressed::MAX_NAME_LEN),
            ));
        }
        let name = name_from_bytes(&stream.read_vec(name_len).map_err(header_error)?);

        let pointer_size = non_negative(stream.read_i32().map_err(header_error)?, "pointer size")?;
        let count = non_negative(stream.read_i32().map_err(header_error)?, "record count")?;

        debug!(
            "Read v{} header: name={}, version={}, pointer_size={}, count={}",
            tag, name, game_version, pointer_size, count
        );

        Ok(Self {
            format: Format::Compressed,
            tag: Some(tag),
            game_version: Some(game_version),
            name,
            pointer_size: pointer_size as u64,
            data_format: None,
            count,
        })
    }

    /// v5 header, positioned after the tag.
    pub fn read_dense<R: Read>(stream: &mut StreamReader<R>, tag: u32) -> Result<Self> {
        let game_version = read_version(stream).map_err(header_error)?;
        let name = name_from_bytes(&stream.read_vec(dense::NAME_SIZE).map_err(header_error)?);
        let pointer_size = non_negative(stream.read_i32().map_err(header_error)?, "pointer size")?;
        let data_format = stream.read_i32().map_err(header_error)?;
        let count = non_negative(stream.read_i32().map_err(header_error)?, "offset count")?;

        debug!(
            "Read v{} header: name={}, version={}, pointer_size={}, data_format={}, count={}",
            tag, name, game_version, pointer_size, data_format, count
        );

        Ok(Self {
            format: Format::Dense,
            tag: Some(tag),
            game_version: Some(game_version),
            name,
            pointer_size: pointer_size as u64,
            data_format: Some(data_format),
            count,
        })
    }

    /// Legacy v0 prefix: a bare `u64` record count.
    pub fn read_legacy<R: Read>(stream: &mut StreamReader<R>) -> Result<Self> {
        let count = stream.read_u64().map_err(header_error)?;
        let count = usize::try_from(count)
            .map_err(|_| Error::malformed(0, format!("record count {count} too large")))?;

        Ok(Self {
            format: Format::Legacy,
            tag: None,
            game_version: None,
            name: String::new(),
            pointer_size: 8,
            data_format: None,
            count,
        })
    }

    /// Fail with [`Error::VersionMismatch`] unless the header targets `expected`.
    pub fn ensure_version(&self, expected: Version) -> Result<()> {
        match self.game_version {
            Some(actual) if actual != expected => Err(Error::VersionMismatch {
                expected,
                actual,
                path: None,
            }),
            _ => Ok(()),
        }
    }
}

fn write_version<W: Write>(w: &mut W, version: Version) -> io::Result<()> {
    for part in version.parts() {
        w.write_all(&u32::from(part).to_le_bytes())?;
    }
    Ok(())
}

fn count_field(count: usize) -> Result<i32> {
    i32::try_from(count).map_err(|_| Error::malformed(count, "too many records for an i32 count"))
}

/// Write a v2 file. `records` are written in the given order.
pub fn write_compressed<W: Write>(
    w: &mut W,
    version: Version,
    name: &str,
    pointer_size: u64,
    records: &[Record],
) -> Result<()> {
    let name = name.as_bytes();
    if name.len() > compressed::MAX_NAME_LEN {
        return Err(Error::malformed(0, "database name too long"));
    }

    w.write_all(&2u32.to_le_bytes())?;
    write_version(w, version)?;
    w.write_all(&(name.len() as u32).to_le_bytes())?;
    w.write_all(name)?;
    w.write_all(&(pointer_size as i32).to_le_bytes())?;
    w.write_all(&count_field(records.len())?.to_le_bytes())?;

    let mut encoder = DeltaEncoder::new(pointer_size);
    w.write_all(&encoder.encode_all(records))?;
    Ok(())
}

/// Write a v5 file covering ids `0..=max id`.
pub fn write_dense<W: Write>(
    w: &mut W,
    version: Version,
    name: &str,
    pointer_size: u64,
    records: &[Record],
) -> Result<()> {
    let slots = records.iter().map(|r| r.id.saturating_add(1)).max().unwrap_or(0);
    let slots = usize::try_from(slots)
        .ok()
        .filter(|&n| i32::try_from(n).is_ok())
        .ok_or_else(|| Error::malformed(0, format!("dense table of {slots} slots")))?;

    let mut table = vec![0u32; slots];
    for (i, record) in records.iter().enumerate() {
        let offset = u32::try_from(record.offset).map_err(|_| {
            Error::malformed(i, format!("offset 0x{:X} does not fit a dense entry", record.offset))
        })?;
        table[record.id as usize] = offset;
    }

    let mut name_field = [0u8; dense::NAME_SIZE];
    let len = name.len().min(dense::NAME_SIZE - 1);
    name_field[..len].copy_from_slice(&name.as_bytes()[..len]);

    w.write_all(&5u32.to_le_bytes())?;
    write_version(w, version)?;
    w.write_all(&name_field)?;
    w.write_all(&(pointer_size as i32).to_le_bytes())?;
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&count_field(slots)?.to_le_bytes())?;
    for offset in table {
        w.write_all(&offset.to_le_bytes())?;
    }
    Ok(())
}

/// Write a legacy v0 file. Records must already be sorted by id.
pub fn write_legacy<W: Write>(w: &mut W, records: &[Record]) -> Result<()> {
    w.write_all(&(records.len() as u64).to_le_bytes())?;
    for record in records {
        w.write_all(&record.id.to_le_bytes())?;
        w.write_all(&record.offset.to_le_bytes())?;
    }
    Ok(())
}
