//! Delta codec for compressed (v1/v2) Address Library payloads
//!
//! Every record starts with a control byte:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! ┌───┬───────────┬───────────────┐
//! │ S │ offset kd │    id kind    │
//! └───┴───────────┴───────────────┘
//! ```
//!
//! The id kind (low nibble) and offset kind (bits 4-6) share one table:
//!
//! | kind | value                  |
//! |------|------------------------|
//! | 0    | explicit `u64`         |
//! | 1    | `base + 1`             |
//! | 2    | `base + u8`            |
//! | 3    | `base - u8`            |
//! | 4    | `base + u16`           |
//! | 5    | `base - u16`           |
//! | 6    | absolute `u16`         |
//! | 7    | absolute `u32`         |
//!
//! For ids the base is the previous id. For offsets the base is the previous
//! offset, or `previous offset / pointer size` when `S` is set; in that case
//! the decoded value is multiplied by the pointer size afterwards.

use std::io::{self, Read};

use crate::database::Record;
use crate::database::stream::StreamReader;
use crate::error::{Error, Result};

const KIND_MASK: u8 = 0x7;
const SCALED_FLAG: u8 = 0x8;

/// State carried from one record to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaState {
    pub prev_id: u64,
    pub prev_offset: u64,
}

fn read_value<R: Read>(stream: &mut StreamReader<R>, kind: u8, base: u64) -> io::Result<u64> {
    Ok(match kind {
        0 => stream.read_u64()?,
        1 => base.wrapping_add(1),
        2 => base.wrapping_add(u64::from(stream.read_u8()?)),
        3 => base.wrapping_sub(u64::from(stream.read_u8()?)),
        4 => base.wrapping_add(u64::from(stream.read_u16()?)),
        5 => base.wrapping_sub(u64::from(stream.read_u16()?)),
        6 => u64::from(stream.read_u16()?),
        7 => u64::from(stream.read_u32()?),
        _ => unreachable!("kind is masked to 3 bits"),
    })
}

fn stream_error(index: usize, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::malformed(index, "stream ended before the declared record count")
    } else {
        Error::Io(err)
    }
}

/// Decode one record and advance `state`.
pub fn decode_record<R: Read>(
    stream: &mut StreamReader<R>,
    state: &mut DeltaState,
    pointer_size: u64,
    index: usize,
) -> Result<Record> {
    let control = stream.read_u8().map_err(|e| stream_error(index, e))?;
    let lo = control & 0xF;
    let hi = control >> 4;

    if lo > KIND_MASK {
        return Err(Error::malformed(
            index,
            format!("unhandled id delta kind {lo} (control byte 0x{control:02X})"),
        ));
    }

    let id = read_value(stream, lo, state.prev_id).map_err(|e| stream_error(index, e))?;

    let scaled = hi & SCALED_FLAG != 0;
    if scaled && pointer_size == 0 {
        return Err(Error::malformed(
            index,
            "pointer-scaled offset with a zero pointer size",
        ));
    }

    let base = if scaled {
        state.prev_offset / pointer_size
    } else {
        state.prev_offset
    };
    let mut offset =
        read_value(stream, hi & KIND_MASK, base).map_err(|e| stream_error(index, e))?;
    if scaled {
        offset = offset.wrapping_mul(pointer_size);
    }

    state.prev_id = id;
    state.prev_offset = offset;

    Ok(Record { id, offset })
}

/// Decode exactly `count` records from `stream`.
pub fn decode_stream<R: Read>(
    stream: &mut StreamReader<R>,
    count: usize,
    pointer_size: u64,
) -> Result<Vec<Record>> {
    let mut state = DeltaState::default();
    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        records.push(decode_record(stream, &mut state, pointer_size, index)?);
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy)]
enum Payload {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Payload {
    fn len(self) -> usize {
        match self {
            Payload::None => 0,
            Payload::U8(_) => 1,
            Payload::U16(_) => 2,
            Payload::U32(_) => 4,
            Payload::U64(_) => 8,
        }
    }

    fn write(self, out: &mut Vec<u8>) {
        match self {
            Payload::None => {}
            Payload::U8(v) => out.push(v),
            Payload::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Payload::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Payload::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// Pick the most compact kind that reproduces `value` from `base`.
fn choose_kind(base: u64, value: u64) -> (u8, Payload) {
    if value == base.wrapping_add(1) {
        return (1, Payload::None);
    }
    if value >= base {
        let diff = value - base;
        if let Ok(d) = u8::try_from(diff) {
            return (2, Payload::U8(d));
        }
        if let Ok(d) = u16::try_from(diff) {
            return (4, Payload::U16(d));
        }
    } else {
        let diff = base - value;
        if let Ok(d) = u8::try_from(diff) {
            return (3, Payload::U8(d));
        }
        if let Ok(d) = u16::try_from(diff) {
            return (5, Payload::U16(d));
        }
    }
    if let Ok(v) = u16::try_from(value) {
        return (6, Payload::U16(v));
    }
    if let Ok(v) = u32::try_from(value) {
        return (7, Payload::U32(v));
    }
    (0, Payload::U64(value))
}

/// Produces the compressed record stream that [`decode_stream`] reads back.
#[derive(Debug, Clone)]
pub struct DeltaEncoder {
    state: DeltaState,
    pointer_size: u64,
}

impl DeltaEncoder {
    pub fn new(pointer_size: u64) -> Self {
        Self {
            state: DeltaState::default(),
            pointer_size,
        }
    }

    pub fn encode(&mut self, record: Record, out: &mut Vec<u8>) {
        let (id_kind, id_payload) = choose_kind(self.state.prev_id, record.id);

        let (mut offset_kind, mut offset_payload) =
            choose_kind(self.state.prev_offset, record.offset);
        let ps = self.pointer_size;
        if ps > 0 && record.offset % ps == 0 {
            let (kind, payload) = choose_kind(self.state.prev_offset / ps, record.offset / ps);
            if payload.len() < offset_payload.len() {
                offset_kind = kind | SCALED_FLAG;
                offset_payload = payload;
            }
        }

        out.push(id_kind | (offset_kind << 4));
        id_payload.write(out);
        offset_payload.write(out);

        self.state = DeltaState {
            prev_id: record.id,
            prev_offset: record.offset,
        };
    }

    pub fn encode_all(&mut self, records: &[Record]) -> Vec<u8> {
        let mut out = Vec::with_capacity(records.len() * 3);
        for record in records {
            self.encode(*record, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u64, offset: u64) -> Record {
        Record { id, offset }
    }

    fn decode(bytes: &[u8], count: usize, pointer_size: u64) -> Result<Vec<Record>> {
        let mut stream = StreamReader::new(bytes);
        decode_stream(&mut stream, count, pointer_size)
    }

    #[test]
    fn test_decode_handwritten_stream() {
        let mut bytes = vec![];
        // id explicit u64, offset absolute u32
        bytes.push(0x70);
        bytes.extend_from_slice(&10u64.to_le_bytes());
        bytes.extend_from_slice(&0x1000u32.to_le_bytes());
        // id +1, offset +u16
        bytes.push(0x41);
        bytes.extend_from_slice(&0x20u16.to_le_bytes());
        // id -u8, offset -u8
        bytes.push(0x33);
        bytes.push(5);
        bytes.push(0x10);
        // id absolute u16, offset scaled +1 (pointer size 8)
        bytes.push(0x96);
        bytes.extend_from_slice(&500u16.to_le_bytes());

        let records = decode(&bytes, 4, 8).unwrap();
        assert_eq!(
            records,
            vec![
                rec(10, 0x1000),
                rec(11, 0x1020),
                rec(6, 0x1010),
                rec(500, (0x1010 / 8 + 1) * 8),
            ]
        );
    }

    #[test]
    fn test_scaled_offset_uses_truncated_base() {
        // prev offset 0x13 with pointer size 8: base = 2, +u8 3 = 5, * 8 = 0x28
        let mut state = DeltaState {
            prev_id: 1,
            prev_offset: 0x13,
        };
        let bytes = [0xA1, 3];
        let mut stream = StreamReader::new(&bytes[..]);
        let r = decode_record(&mut stream, &mut state, 8, 0).unwrap();
        assert_eq!(r, rec(2, 0x28));
        assert_eq!(state.prev_offset, 0x28);
    }

    #[test]
    fn test_invalid_id_nibble_is_malformed() {
        let bytes = [0x08];
        let err = decode(&bytes, 1, 8).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { record: 0, .. }));
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let bytes = [0x11, 0x11];
        let err = decode(&bytes, 3, 8).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { record: 2, .. }));

        let bytes = [0x00, 0x01, 0x02];
        let err = decode(&bytes, 1, 8).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { record: 0, .. }));
    }

    #[test]
    fn test_scaled_with_zero_pointer_size_is_malformed() {
        let bytes = [0x91];
        let err = decode(&bytes, 1, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }

    #[test]
    fn test_encoder_output_decodes_to_input() {
        let records = vec![
            rec(1, 0x1000),
            rec(2, 0x1008),
            rec(3, 0x1010),
            rec(250, 0x1010),
            rec(240, 0x2_0000),
            rec(70_000, 0x1_0000_0000),
            rec(69_000, 0x1_0000_0008),
            rec(u64::MAX - 1, 0x38),
            rec(5, 0x7FFF_FFFF_0000),
            rec(6, 0x18),
        ];
        let mut encoder = DeltaEncoder::new(8);
        let bytes = encoder.encode_all(&records);
        assert_eq!(decode(&bytes, records.len(), 8).unwrap(), records);
    }

    #[test]
    fn test_encoder_prefers_pointer_scaling() {
        let records = vec![rec(1, 0x8_0000), rec(2, 0x8_0000 + 8 * 200)];
        let mut encoder = DeltaEncoder::new(8);
        let bytes = encoder.encode_all(&records);

        // second record: id +1, offset scaled +u8 200
        let tail = &bytes[bytes.len() - 2..];
        assert_eq!(tail, &[0xA1, 200]);
        assert_eq!(decode(&bytes, 2, 8).unwrap(), records);
    }

    #[test]
    fn test_sequential_records_are_one_byte_each() {
        let records: Vec<_> = (1..=100).map(|i| rec(i, i)).collect();
        let mut encoder = DeltaEncoder::new(8);
        let bytes = encoder.encode_all(&records);
        assert_eq!(bytes.len(), 100);
        assert!(bytes.iter().all(|&b| b == 0x11));
    }
}
