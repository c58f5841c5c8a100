//! Runtime-variant id selection and address computation.

mod candidate;

pub use candidate::{CandidateSet, Id};

use crate::database::AddressDatabase;
use crate::error::Result;
use crate::host::{HostModule, RuntimeDetector};

/// Pick `first` for runtime 0 and `second` for any other runtime.
pub fn relocate<T>(index: usize, first: T, second: T) -> T {
    if index == 0 { first } else { second }
}

/// Pick per runtime 1 and 2, `first` for everything else.
pub fn relocate3<T>(index: usize, first: T, second: T, third: T) -> T {
    match index {
        1 => second,
        2 => third,
        _ => first,
    }
}

/// A database together with the host it was loaded for.
pub struct Relocator<'a> {
    db: &'a AddressDatabase,
    host: &'a dyn HostModule,
    runtime: &'a dyn RuntimeDetector,
}

impl<'a> Relocator<'a> {
    pub fn new(
        db: &'a AddressDatabase,
        host: &'a dyn HostModule,
        runtime: &'a dyn RuntimeDetector,
    ) -> Self {
        Self { db, host, runtime }
    }

    pub fn database(&self) -> &AddressDatabase {
        self.db
    }

    /// Id chosen from `set` for the detected runtime
    pub fn resolve_id<const N: usize>(&self, set: &CandidateSet<N>) -> u64 {
        set.resolve(self.runtime.runtime_index())
    }

    pub fn offset<const N: usize>(&self, set: &CandidateSet<N>) -> Result<u64> {
        set.offset(self.db, self.runtime.runtime_index())
    }

    /// Absolute address of `set` in the running host
    pub fn address<const N: usize>(&self, set: &CandidateSet<N>) -> Result<usize> {
        set.address(self.db, self.host.base(), self.runtime.runtime_index())
    }

    /// Runtime-dependent value, falling back to `first` when undetermined
    pub fn relocate<T>(&self, first: T, second: T) -> T {
        relocate(self.runtime.runtime_index().unwrap_or(0), first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::{DatabaseSource, Record, SourceKind, write_compressed};
    use crate::error::Error;
    use crate::host::{FixedRuntime, StaticHost};
    use crate::shared::SharedCache;
    use crate::version::Version;

    const V: Version = Version::new(1, 6, 1170, 0);
    const BASE: usize = 0x1_4000_0000;

    fn load(dir: &std::path::Path) -> AddressDatabase {
        let records = [
            Record {
                id: 100,
                offset: 0x1000,
            },
            Record {
                id: 200,
                offset: 0x2000,
            },
        ];
        let path = dir.join("versionlib-1-6-1170-0.bin");
        let mut bytes = Vec::new();
        write_compressed(&mut bytes, V, "SkyrimSE.exe", 8, &records).unwrap();
        std::fs::write(&path, bytes).unwrap();

        AddressDatabase::load(
            &DatabaseSource::new(path, SourceKind::Binary),
            V,
            &DatabaseConfig::default(),
            &SharedCache::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_relocate_helpers() {
        assert_eq!(relocate(0, "se", "ae"), "se");
        assert_eq!(relocate(1, "se", "ae"), "ae");
        assert_eq!(relocate(4, "se", "ae"), "ae");

        assert_eq!(relocate3(0, 1, 2, 3), 1);
        assert_eq!(relocate3(1, 1, 2, 3), 2);
        assert_eq!(relocate3(2, 1, 2, 3), 3);
        assert_eq!(relocate3(9, 1, 2, 3), 1);
    }

    #[test]
    fn test_relocator_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let db = load(dir.path());
        let host = StaticHost::new(BASE, V);
        let runtime = FixedRuntime(Some(1));
        let relocator = Relocator::new(&db, &host, &runtime);

        let set = CandidateSet::pair(100, 200);
        assert_eq!(relocator.resolve_id(&set), 200);
        assert_eq!(relocator.offset(&set).unwrap(), 0x2000);
        assert_eq!(relocator.address(&set).unwrap(), BASE + 0x2000);
        assert_eq!(relocator.relocate(8, 16), 16);

        let fallback = CandidateSet::pair(100, 0);
        assert_eq!(relocator.address(&fallback).unwrap(), BASE + 0x1000);
    }

    #[test]
    fn test_unresolvable_sets() {
        let dir = tempfile::tempdir().unwrap();
        let db = load(dir.path());
        let host = StaticHost::new(BASE, V);
        let undetected = FixedRuntime(None);
        let relocator = Relocator::new(&db, &host, &undetected);

        let empty = CandidateSet::<2>::new([0, 0]);
        assert!(matches!(
            relocator.offset(&empty),
            Err(Error::IdNotFound { id: 0, .. })
        ));

        let unknown = CandidateSet::single(300);
        assert!(matches!(
            relocator.address(&unknown),
            Err(Error::IdNotFound { id: 300, version }) if version == V
        ));
        assert_eq!(relocator.relocate("first", "second"), "first");
    }
}
