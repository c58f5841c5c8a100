use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::layout::{dense, legacy};
use crate::error::{Error, Result};
use crate::shared::Region;

/// One id → offset mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// `{u64 id, u64 offset}` pairs ascending by id
    Sorted,
    /// One `u32` offset per id, zero meaning absent
    Dense,
}

/// Serialize records into the sorted in-memory layout.
pub fn encode_sorted(records: &[Record]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(records.len() * legacy::RECORD_SIZE);
    for record in records {
        bytes.extend_from_slice(&record.id.to_le_bytes());
        bytes.extend_from_slice(&record.offset.to_le_bytes());
    }
    bytes
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

/// Read-only view of the records inside a shared region.
#[derive(Debug, Clone)]
pub struct RecordStore {
    region: Arc<Region>,
    layout: StoreLayout,
    start: usize,
    count: usize,
}

impl RecordStore {
    pub fn sorted(region: Arc<Region>, start: usize, count: usize) -> Result<Self> {
        Self::new(region, StoreLayout::Sorted, start, count)
    }

    pub fn dense(region: Arc<Region>, start: usize, count: usize) -> Result<Self> {
        Self::new(region, StoreLayout::Dense, start, count)
    }

    fn new(region: Arc<Region>, layout: StoreLayout, start: usize, count: usize) -> Result<Self> {
        let entry = match layout {
            StoreLayout::Sorted => legacy::RECORD_SIZE,
            StoreLayout::Dense => dense::ENTRY_SIZE,
        };
        let needed = count
            .checked_mul(entry)
            .and_then(|n| n.checked_add(start))
            .ok_or_else(|| Error::malformed(0, format!("record count {count} overflows")))?;
        if region.len() < needed {
            return Err(Error::malformed(
                region.len().saturating_sub(start) / entry,
                format!(
                    "region '{}' holds {} bytes but {} records need {}",
                    region.name(),
                    region.len(),
                    count,
                    needed
                ),
            ));
        }

        Ok(Self {
            region,
            layout,
            start,
            count,
        })
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    /// Number of slots (records for sorted stores, ids for dense stores)
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    fn bytes(&self) -> &[u8] {
        self.region.as_bytes()
    }

    fn sorted_id(&self, index: usize) -> u64 {
        read_u64(self.bytes(), self.start + index * legacy::RECORD_SIZE)
    }

    fn sorted_offset(&self, index: usize) -> u64 {
        read_u64(self.bytes(), self.start + index * legacy::RECORD_SIZE + 8)
    }

    fn dense_offset(&self, id: usize) -> u64 {
        u64::from(read_u32(self.bytes(), self.start + id * dense::ENTRY_SIZE))
    }

    /// Offset stored for `id`, if any.
    pub fn lookup(&self, id: u64) -> Option<u64> {
        match self.layout {
            StoreLayout::Sorted => {
                let (mut lo, mut hi) = (0, self.count);
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    if self.sorted_id(mid) < id {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                (lo < self.count && self.sorted_id(lo) == id).then(|| self.sorted_offset(lo))
            }
            StoreLayout::Dense => {
                let index = usize::try_from(id).ok().filter(|&i| i < self.count)?;
                let offset = self.dense_offset(index);
                (offset != 0).then_some(offset)
            }
        }
    }

    /// Present records in ascending id order. Dense zero entries are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.count).filter_map(move |i| match self.layout {
            StoreLayout::Sorted => Some(Record {
                id: self.sorted_id(i),
                offset: self.sorted_offset(i),
            }),
            StoreLayout::Dense => {
                let offset = self.dense_offset(i);
                (offset != 0).then_some(Record {
                    id: i as u64,
                    offset,
                })
            }
        })
    }
}

/// Reverse index from offset to id, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    by_offset: Vec<Record>,
}

impl OffsetIndex {
    pub fn from_store(store: &RecordStore) -> Self {
        let mut by_offset: Vec<Record> = store.iter().collect();
        by_offset.sort_by_key(|r| (r.offset, r.id));
        Self { by_offset }
    }

    /// Lowest id whose offset equals `offset`
    pub fn id_for(&self, offset: u64) -> Option<u64> {
        let pos = self.by_offset.partition_point(|r| r.offset < offset);
        self.by_offset
            .get(pos)
            .filter(|r| r.offset == offset)
            .map(|r| r.id)
    }

    /// Record with the greatest offset not above `offset`
    pub fn containing(&self, offset: u64) -> Option<Record> {
        let pos = self.by_offset.partition_point(|r| r.offset <= offset);
        pos.checked_sub(1).map(|i| self.by_offset[i])
    }

    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_store(records: &[Record]) -> RecordStore {
        let region = Arc::new(Region::from_bytes("test", encode_sorted(records)));
        RecordStore::sorted(region, 0, records.len()).unwrap()
    }

    fn dense_store(offsets: &[u32]) -> RecordStore {
        let mut bytes = vec![0xEE; 8];
        for o in offsets {
            bytes.extend_from_slice(&o.to_le_bytes());
        }
        let region = Arc::new(Region::from_bytes("dense", bytes));
        RecordStore::dense(region, 8, offsets.len()).unwrap()
    }

    #[test]
    fn test_sorted_lookup_hits_and_misses() {
        let records: Vec<Record> = [2u64, 3, 10, 11, 400, 70_000]
            .iter()
            .map(|&id| Record {
                id,
                offset: id * 0x10,
            })
            .collect();
        let store = sorted_store(&records);

        for r in &records {
            assert_eq!(store.lookup(r.id), Some(r.offset));
        }
        for missing in [0u64, 1, 4, 9, 12, 399, 401, 70_001, u64::MAX] {
            assert_eq!(store.lookup(missing), None, "id {missing}");
        }
    }

    #[test]
    fn test_empty_sorted_store() {
        let store = sorted_store(&[]);
        assert!(store.is_empty());
        assert_eq!(store.lookup(0), None);
    }

    #[test]
    fn test_dense_lookup() {
        let store = dense_store(&[0, 0x1000, 0, 0x2000]);
        assert_eq!(store.lookup(0), None);
        assert_eq!(store.lookup(1), Some(0x1000));
        assert_eq!(store.lookup(2), None);
        assert_eq!(store.lookup(3), Some(0x2000));
        assert_eq!(store.lookup(4), None);
        assert_eq!(store.lookup(u64::MAX), None);
    }

    #[test]
    fn test_dense_iter_skips_absent() {
        let store = dense_store(&[0, 0x1000, 0, 0x2000]);
        let records: Vec<_> = store.iter().collect();
        assert_eq!(
            records,
            vec![
                Record {
                    id: 1,
                    offset: 0x1000
                },
                Record {
                    id: 3,
                    offset: 0x2000
                },
            ]
        );
    }

    #[test]
    fn test_region_too_small() {
        let region = Arc::new(Region::from_bytes("short", vec![0; 20]));
        let err = RecordStore::sorted(region, 0, 2).unwrap_err();
        assert!(matches!(err, Error::MalformedStream { .. }));
    }

    #[test]
    fn test_offset_index() {
        let store = sorted_store(&[
            Record {
                id: 1,
                offset: 0x300,
            },
            Record {
                id: 2,
                offset: 0x100,
            },
            Record {
                id: 3,
                offset: 0x200,
            },
        ]);
        let index = OffsetIndex::from_store(&store);
        assert_eq!(index.len(), 3);
        assert_eq!(index.id_for(0x100), Some(2));
        assert_eq!(index.id_for(0x300), Some(1));
        assert_eq!(index.id_for(0x150), None);
        assert_eq!(index.containing(0x150).map(|r| r.id), Some(2));
        assert_eq!(index.containing(0x50), None);
    }
}
