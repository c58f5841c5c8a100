//! Resolving which database file a command works on.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use addrlib_core::database::{Header, StreamReader};
use addrlib_core::{AddressDatabase, DatabaseSource, Loader, SourceKind, Version, locate};
use anyhow::{Context as _, Result, bail};
use tracing::debug;

use super::Context;

/// Version encoded in a database file name, e.g. `versionlib-1-6-1170-0.bin`
pub fn version_from_file_name(path: &Path) -> Option<Version> {
    let stem = path.file_stem()?.to_str()?;
    let (_, version) = stem.split_once('-')?;
    version.replace('-', ".").parse().ok()
}

/// Whether `path` is an F4SE `version-*.bin`, which is always the legacy layout
fn is_legacy_file(path: &Path, loader: Option<Loader>) -> bool {
    loader == Some(Loader::F4se)
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("version-") && name.ends_with(".bin"))
}

fn version_from_header(path: &Path) -> Option<Version> {
    let file = File::open(path).ok()?;
    let header = Header::read_binary(&mut StreamReader::new(BufReader::new(file))).ok()?;
    header.game_version
}

/// Source and host version for an explicit file
pub fn describe_file(ctx: &Context<'_>, path: &Path) -> Result<(DatabaseSource, Version)> {
    let legacy = ctx.legacy || is_legacy_file(path, ctx.config.loader);
    let source = DatabaseSource::from_path(path, legacy);
    let version = ctx
        .version
        .or_else(|| version_from_file_name(path))
        .or_else(|| match source.kind {
            SourceKind::Binary => version_from_header(path),
            SourceKind::Legacy | SourceKind::Csv => None,
        });

    match version {
        Some(version) => Ok((source, version)),
        None => bail!(
            "Cannot determine the game version of {}; pass --game-version",
            path.display()
        ),
    }
}

/// Source located from the configured loader and `--game-version`
pub fn discover(ctx: &Context<'_>) -> Result<(DatabaseSource, Version)> {
    let version = ctx
        .version
        .context("--game-version is required to locate a database")?;
    let loader = ctx
        .config
        .loader
        .context("--loader (or `loader` in the config file) is required to locate a database")?;
    let source = locate(&ctx.config.search_dir, loader, version)?;
    Ok((source, version))
}

/// Load `file`, or the located database when no file is given.
pub fn open(ctx: &Context<'_>, file: Option<&Path>) -> Result<AddressDatabase> {
    let (source, version) = match file {
        Some(path) => describe_file(ctx, path)?,
        None => discover(ctx)?,
    };
    debug!("Opening {} for {}", source.path.display(), version);

    let db = AddressDatabase::load(&source, version, &ctx.config, ctx.cache)
        .with_context(|| format!("Failed to load {}", source.path.display()))?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use addrlib_core::{DatabaseConfig, Record, SharedCache, write_compressed};
    use std::path::PathBuf;

    const V: Version = Version::new(1, 10, 163, 0);

    #[test]
    fn test_version_from_file_name() {
        assert_eq!(
            version_from_file_name(Path::new("Data/SKSE/Plugins/versionlib-1-6-1170-0.bin")),
            Some(Version::new(1, 6, 1170, 0))
        );
        assert_eq!(
            version_from_file_name(Path::new("version-1-10-163-0.csv")),
            Some(V)
        );
        assert_eq!(version_from_file_name(Path::new("offsets.bin")), None);
    }

    #[test]
    fn test_legacy_only_for_f4se() {
        let path = PathBuf::from("version-1-10-163-0.bin");
        assert!(is_legacy_file(&path, Some(Loader::F4se)));
        assert!(!is_legacy_file(&path, Some(Loader::Skse)));
        assert!(!is_legacy_file(&path, None));
        assert!(!is_legacy_file(Path::new("version-1-10-163-0.csv"), Some(Loader::F4se)));
    }

    #[test]
    fn test_version_falls_back_to_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamed.bin");
        let mut bytes = Vec::new();
        let records = [Record {
            id: 1,
            offset: 0x10,
        }];
        write_compressed(&mut bytes, V, "Fallout4.exe", 8, &records).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let cache = SharedCache::new();
        let ctx = Context::new(DatabaseConfig::default(), None, &cache);
        let (source, version) = describe_file(&ctx, &path).unwrap();
        assert_eq!(source.kind, SourceKind::Binary);
        assert_eq!(version, V);

        let db = open(&ctx, Some(&path)).unwrap();
        assert_eq!(db.offset(1).unwrap(), 0x10);
    }

    #[test]
    fn test_discover_needs_version_and_loader() {
        let cache = SharedCache::new();
        let ctx = Context::new(DatabaseConfig::default(), None, &cache);
        assert!(discover(&ctx).is_err());

        let ctx = Context::new(DatabaseConfig::default(), Some(V), &cache);
        let err = discover(&ctx).unwrap_err();
        assert!(err.to_string().contains("--loader"));
    }
}
