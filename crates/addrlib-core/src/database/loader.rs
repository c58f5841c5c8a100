//! Script extender loaders and database file discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::database::format::Format;
use crate::error::{Error, Result};
use crate::version::Version;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Loader {
    #[strum(serialize = "SKSE")]
    Skse,
    #[strum(serialize = "F4SE")]
    F4se,
    #[strum(serialize = "SFSE")]
    Sfse,
    #[strum(serialize = "OBSE")]
    Obse,
}

impl Loader {
    /// File name roots, in lookup order
    pub fn roots(&self) -> &'static [&'static str] {
        match self {
            Loader::Skse => &["versionlib", "version"],
            Loader::F4se => &["version"],
            Loader::Sfse | Loader::Obse => &["versionlib"],
        }
    }

    /// Whether `<root>-*.bin` is the legacy count-prefixed layout for this loader
    fn is_legacy_root(&self, root: &str) -> bool {
        *self == Loader::F4se && root == "version"
    }
}

/// How a located file must be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Legacy v0; the format is implied by the file name
    Legacy,
    /// Self-describing binary; the leading tag selects the format
    Binary,
    Csv,
}

impl SourceKind {
    /// The format when it is known without reading the file
    pub fn implied_format(&self) -> Option<Format> {
        match self {
            SourceKind::Legacy => Some(Format::Legacy),
            SourceKind::Csv => Some(Format::Csv),
            SourceKind::Binary => None,
        }
    }
}

/// A database file and how to read it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl DatabaseSource {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Guess the kind from the file name: `.csv` is text, `version-*.bin` with
    /// `legacy = true` is v0, anything else is self-describing.
    pub fn from_path(path: impl Into<PathBuf>, legacy: bool) -> Self {
        let path = path.into();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let kind = if is_csv {
            SourceKind::Csv
        } else if legacy {
            SourceKind::Legacy
        } else {
            SourceKind::Binary
        };
        Self { path, kind }
    }
}

/// File name for `root` and `version`, e.g. `versionlib-1-6-1170-0.bin`
pub fn database_file_name(root: &str, version: Version, extension: &str) -> String {
    format!("{}-{}.{}", root, version.to_string_with("-"), extension)
}

/// Find the database for `loader` and `version` in `dir`.
///
/// For each root, a binary file is preferred over a CSV one.
pub fn locate(dir: &Path, loader: Loader, version: Version) -> Result<DatabaseSource> {
    for root in loader.roots() {
        let bin = dir.join(database_file_name(root, version, "bin"));
        debug!("Probing {}", bin.display());
        if bin.is_file() {
            let kind = if loader.is_legacy_root(root) {
                SourceKind::Legacy
            } else {
                SourceKind::Binary
            };
            return Ok(DatabaseSource::new(bin, kind));
        }

        let csv = dir.join(database_file_name(root, version, "csv"));
        debug!("Probing {}", csv.display());
        if csv.is_file() {
            return Ok(DatabaseSource::new(csv, SourceKind::Csv));
        }
    }

    Err(Error::NoDatabaseFound {
        loader: loader.to_string(),
        version,
        dir: dir.to_path_buf(),
    })
}
