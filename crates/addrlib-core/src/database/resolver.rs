use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::database::codec::decode_stream;
use crate::database::csv::read_csv;
use crate::database::format::{Format, Header};
use crate::database::layout::{dense, legacy};
use crate::database::loader::{DatabaseSource, SourceKind, locate};
use crate::database::store::{OffsetIndex, Record, RecordStore, encode_sorted};
use crate::database::stream::StreamReader;
use crate::error::{Error, Result};
use crate::host::HostModule;
use crate::shared::{Region, SharedCache};
use crate::version::Version;

fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::FileNotOpenable {
            path: path.to_path_buf(),
            source,
        })
}

/// A loaded, validated Address Library for one host version.
///
/// Immutable once constructed; lookups only read the shared region.
#[derive(Debug, Clone)]
pub struct AddressDatabase {
    path: PathBuf,
    format: Format,
    version: Version,
    name: String,
    pointer_size: u64,
    store: RecordStore,
    is_owner: bool,
}

impl AddressDatabase {
    /// Locate the database for `host` with the configured loader and load it
    /// through the process-wide cache.
    pub fn open(config: &DatabaseConfig, host: &dyn HostModule) -> Result<Self> {
        let loader = config.loader.ok_or(Error::LoaderNotConfigured)?;
        let version = host.version();
        let source = locate(&config.search_dir, loader, version)?;
        Self::load(&source, version, config, SharedCache::global())
    }

    /// Load `source` for host `version`, building or attaching to its region in `cache`.
    pub fn load(
        source: &DatabaseSource,
        version: Version,
        config: &DatabaseConfig,
        cache: &SharedCache,
    ) -> Result<Self> {
        let region_name = config.region_name(version);
        let path = source.path.as_path();
        debug!("Loading {} as {:?}", path.display(), source.kind);

        let database = match source.kind {
            SourceKind::Legacy => Self::load_legacy(path, version, &region_name, cache),
            SourceKind::Binary => Self::load_binary(path, version, &region_name, cache),
            SourceKind::Csv => Self::load_csv(path, version, &region_name, cache),
        }
        .map_err(|err| err.in_file(path))?;

        if config.verify_blacklist {
            config
                .blacklist()?
                .check(database.store.region(), version, path)?;
        }

        info!(
            "Loaded Address Library {} ({}, {} entries, version {}, {})",
            path.display(),
            database.format,
            database.store.len(),
            version,
            if database.is_owner { "built" } else { "attached" }
        );

        Ok(database)
    }

    fn load_legacy(
        path: &Path,
        version: Version,
        region_name: &str,
        cache: &SharedCache,
    ) -> Result<Self> {
        let acquired = cache.acquire(region_name, || Region::map_file(region_name, path))?;
        let header = Header::read_legacy(&mut StreamReader::new(acquired.region.as_bytes()))?;
        let store = RecordStore::sorted(acquired.region, legacy::COUNT_SIZE, header.count)?;

        Ok(Self {
            path: path.to_path_buf(),
            format: Format::Legacy,
            version,
            name: header.name,
            pointer_size: header.pointer_size,
            store,
            is_owner: acquired.is_owner,
        })
    }

    fn load_binary(
        path: &Path,
        version: Version,
        region_name: &str,
        cache: &SharedCache,
    ) -> Result<Self> {
        let mut stream = StreamReader::new(open_file(path)?);
        let header = Header::read_binary(&mut stream)?;
        header.ensure_version(version)?;

        let (acquired, store) = match header.format {
            Format::Compressed => {
                let acquired = cache.acquire(region_name, || {
                    let mut records = decode_stream(&mut stream, header.count, header.pointer_size)?;
                    records.sort_unstable();
                    debug!("Decoded {} records from {}", records.len(), path.display());
                    Ok(Region::from_bytes(region_name, encode_sorted(&records)))
                })?;
                let count = acquired.region.len() / legacy::RECORD_SIZE;
                let store = RecordStore::sorted(Arc::clone(&acquired.region), 0, count)?;
                (acquired, store)
            }
            Format::Dense => {
                let acquired = cache.acquire(region_name, || Region::map_file(region_name, path))?;
                let store =
                    RecordStore::dense(Arc::clone(&acquired.region), dense::HEADER_SIZE, header.count)?;
                (acquired, store)
            }
            Format::Legacy | Format::Csv => unreachable!("read_binary only yields binary formats"),
        };

        Ok(Self {
            path: path.to_path_buf(),
            format: header.format,
            version,
            name: header.name,
            pointer_size: header.pointer_size,
            store,
            is_owner: acquired.is_owner,
        })
    }

    fn load_csv(
        path: &Path,
        version: Version,
        region_name: &str,
        cache: &SharedCache,
    ) -> Result<Self> {
        let acquired = cache.acquire(region_name, || {
            let database = read_csv(path)?;
            Ok(Region::from_bytes(region_name, encode_sorted(&database.records)))
        })?;
        let count = acquired.region.len() / legacy::RECORD_SIZE;
        let store = RecordStore::sorted(Arc::clone(&acquired.region), 0, count)?;

        Ok(Self {
            path: path.to_path_buf(),
            format: Format::Csv,
            version,
            name: String::new(),
            pointer_size: 8,
            store,
            is_owner: acquired.is_owner,
        })
    }

    /// Offset of `id` from the host base.
    pub fn offset(&self, id: u64) -> Result<u64> {
        self.try_offset(id).ok_or(Error::IdNotFound {
            id,
            version: self.version,
        })
    }

    pub fn try_offset(&self, id: u64) -> Option<u64> {
        self.store.lookup(id)
    }

    /// Absolute address of `id` for an image loaded at `base`.
    ///
    /// Fails with [`Error::AddressOverflow`] if `base + offset` leaves the
    /// address space.
    pub fn address(&self, id: u64, base: usize) -> Result<usize> {
        let offset = self.offset(id)?;
        usize::try_from(offset)
            .ok()
            .and_then(|offset| base.checked_add(offset))
            .ok_or(Error::AddressOverflow { id, base, offset })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Host version the database was loaded for
    pub fn version(&self) -> Version {
        self.version
    }

    /// Name stored in the header; empty for legacy and CSV files
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    /// Whether this load built the shared region rather than attaching to it
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Present records in ascending id order
    pub fn records(&self) -> Vec<Record> {
        self.store.iter().collect()
    }

    pub fn offset_index(&self) -> OffsetIndex {
        OffsetIndex::from_store(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::blacklist::{BlacklistEntry, content_hash};
    use crate::database::csv::write_csv;
    use crate::database::format::{write_compressed, write_dense, write_legacy};
    use crate::database::loader::Loader;
    use crate::host::StaticHost;
    use std::fs;
    use std::sync::Barrier;
    use std::thread;

    const V: Version = Version::new(1, 6, 1170, 0);

    fn records() -> Vec<Record> {
        [(2u64, 0x1000u64), (3, 0x1008), (10, 0x2000), (11, 0x2010), (400, 0x12_3450)]
            .iter()
            .map(|&(id, offset)| Record { id, offset })
            .collect()
    }

    fn config() -> DatabaseConfig {
        DatabaseConfig::default()
    }

    fn write_fixture(dir: &Path, file_name: &str, format: Format) -> PathBuf {
        let path = dir.join(file_name);
        let mut bytes = Vec::new();
        match format {
            Format::Legacy => write_legacy(&mut bytes, &records()).unwrap(),
            Format::Compressed => {
                write_compressed(&mut bytes, V, "SkyrimSE.exe", 8, &records()).unwrap()
            }
            Format::Dense => write_dense(&mut bytes, V, "SkyrimSE.exe", 8, &records()).unwrap(),
            Format::Csv => write_csv(&mut bytes, V, &records()).unwrap(),
        }
        fs::write(&path, bytes).unwrap();
        path
    }

    fn assert_resolves_all(db: &AddressDatabase) {
        for record in records() {
            assert_eq!(db.offset(record.id).unwrap(), record.offset);
        }
        for missing in [0u64, 1, 4, 9, 399, 401, u64::MAX] {
            assert!(matches!(
                db.offset(missing),
                Err(Error::IdNotFound { id, version }) if id == missing && version == V
            ));
        }
    }

    #[test]
    fn test_load_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            ("version-1-6-1170-0.bin", SourceKind::Legacy, Format::Legacy),
            ("versionlib-1-6-1170-0.bin", SourceKind::Binary, Format::Compressed),
            ("dense-1-6-1170-0.bin", SourceKind::Binary, Format::Dense),
            ("versionlib-1-6-1170-0.csv", SourceKind::Csv, Format::Csv),
        ];

        for (file_name, kind, format) in cases {
            let path = write_fixture(dir.path(), file_name, format);
            let cache = SharedCache::new();
            let db = AddressDatabase::load(&DatabaseSource::new(&path, kind), V, &config(), &cache)
                .unwrap();

            assert_eq!(db.format(), format, "{file_name}");
            assert!(db.is_owner());
            assert_eq!(db.path(), path);
            assert_resolves_all(&db);
            assert_eq!(db.records(), records());
        }
    }

    #[test]
    fn test_dense_zero_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "v5.bin", Format::Dense);
        let db = AddressDatabase::load(
            &DatabaseSource::new(&path, SourceKind::Binary),
            V,
            &config(),
            &SharedCache::new(),
        )
        .unwrap();

        assert_eq!(db.len(), 401);
        assert_eq!(db.name(), "SkyrimSE.exe");
        assert!(db.try_offset(5).is_none());
        assert!(matches!(db.offset(5), Err(Error::IdNotFound { id: 5, .. })));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        for format in [Format::Compressed, Format::Dense] {
            let path = write_fixture(dir.path(), "db.bin", format);
            let err = AddressDatabase::load(
                &DatabaseSource::new(&path, SourceKind::Binary),
                Version::new(1, 5, 97, 0),
                &config(),
                &SharedCache::new(),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                Error::VersionMismatch { expected, actual, .. }
                    if expected == Version::new(1, 5, 97, 0) && actual == V
            ));
            assert!(err.to_string().contains("db.bin"), "{err}");
        }
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v3.bin");
        fs::write(&path, 3u32.to_le_bytes()).unwrap();
        let err = AddressDatabase::load(
            &DatabaseSource::new(&path, SourceKind::Binary),
            V,
            &config(),
            &SharedCache::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedFormat { tag: 3, path: Some(ref p) } if *p == path
        ));
        assert!(err.to_string().contains("v3.bin"), "{err}");
    }

    #[test]
    fn test_truncated_stream_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let full = write_fixture(dir.path(), "full.bin", Format::Compressed);
        let bytes = fs::read(&full).unwrap();
        let path = dir.path().join("truncated-1-6-1170-0.bin");
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        let err = AddressDatabase::load(
            &DatabaseSource::new(&path, SourceKind::Binary),
            V,
            &config(),
            &SharedCache::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedStream { path: Some(_), .. }));
        assert!(err.to_string().contains("truncated-1-6-1170-0.bin"), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatabaseSource::new(dir.path().join("absent.bin"), SourceKind::Binary);
        let err = AddressDatabase::load(&source, V, &config(), &SharedCache::new()).unwrap_err();
        assert!(matches!(err, Error::FileNotOpenable { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_blacklisted_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "versionlib.bin", Format::Compressed);
        let source = DatabaseSource::new(&path, SourceKind::Binary);

        let bad_hash = content_hash(&encode_sorted(&records()));
        let config = DatabaseConfig::builder()
            .blacklist_entry(BlacklistEntry::new(V, bad_hash))
            .build();
        let err = AddressDatabase::load(&source, V, &config, &SharedCache::new()).unwrap_err();
        assert!(matches!(err, Error::BlacklistedDatabase { version, .. } if version == V));

        let unchecked = DatabaseConfig {
            verify_blacklist: false,
            ..config
        };
        assert!(AddressDatabase::load(&source, V, &unchecked, &SharedCache::new()).is_ok());
    }

    #[test]
    fn test_second_load_attaches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "versionlib.bin", Format::Compressed);
        let source = DatabaseSource::new(&path, SourceKind::Binary);
        let cache = SharedCache::new();

        let first = AddressDatabase::load(&source, V, &config(), &cache).unwrap();
        let second = AddressDatabase::load(&source, V, &config(), &cache).unwrap();
        assert!(first.is_owner());
        assert!(!second.is_owner());
        assert!(Arc::ptr_eq(first.store().region(), second.store().region()));
        assert_eq!(second.pointer_size(), 8);
        assert_resolves_all(&second);
    }

    #[test]
    fn test_concurrent_first_loads_decode_once() {
        const THREADS: usize = 12;
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "versionlib.bin", Format::Compressed);
        let source = DatabaseSource::new(&path, SourceKind::Binary);
        let cache = SharedCache::new();
        let barrier = Barrier::new(THREADS);

        let loaded: Vec<AddressDatabase> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        AddressDatabase::load(&source, V, &config(), &cache).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(loaded.iter().filter(|db| db.is_owner()).count(), 1);
        for db in &loaded {
            assert!(Arc::ptr_eq(db.store().region(), loaded[0].store().region()));
            assert_eq!(db.records(), records());
        }
    }

    #[test]
    fn test_address_and_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "db.csv", Format::Csv);
        let db = AddressDatabase::load(
            &DatabaseSource::new(&path, SourceKind::Csv),
            V,
            &config(),
            &SharedCache::new(),
        )
        .unwrap();

        assert_eq!(db.address(10, 0x1_4000_0000).unwrap(), 0x1_4000_2000);
        assert!(matches!(
            db.address(12, 0x1_4000_0000),
            Err(Error::IdNotFound { id: 12, .. })
        ));
        assert!(matches!(
            db.address(10, usize::MAX),
            Err(Error::AddressOverflow { id: 10, base: usize::MAX, offset: 0x2000 })
        ));

        let index = db.offset_index();
        assert_eq!(index.id_for(0x2010), Some(11));
        assert_eq!(index.id_for(0x2011), None);
    }

    #[test]
    fn test_open_requires_loader() {
        let host = StaticHost::new(0x1_4000_0000, V);
        let err = AddressDatabase::open(&config(), &host).unwrap_err();
        assert!(matches!(err, Error::LoaderNotConfigured));

        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::builder()
            .search_dir(dir.path())
            .loader(Loader::Sfse)
            .build();
        let err = AddressDatabase::open(&config, &host).unwrap_err();
        assert!(matches!(err, Error::NoDatabaseFound { .. }));
    }
}
