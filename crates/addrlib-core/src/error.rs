use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::version::Version;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to open Address Library file: {}: {source}", path.display())]
    FileNotOpenable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported Address Library format: {tag}{}", file_suffix(path))]
    UnsupportedFormat { tag: i64, path: Option<PathBuf> },

    #[error(
        "Address Library version mismatch: expected {expected}, actual {actual}{}",
        file_suffix(path)
    )]
    VersionMismatch {
        expected: Version,
        actual: Version,
        path: Option<PathBuf>,
    },

    #[error(
        "Invalid Address Library loaded for game version {version}: redownload Address Library for your game version ({})",
        path.display()
    )]
    BlacklistedDatabase { path: PathBuf, version: Version },

    #[error("Failed to create Address Library shared region '{name}': {message}")]
    SharedRegionCreationFailed { name: String, message: String },

    #[error("No valid mappings found in Address Library file: {}", path.display())]
    EmptyDatabase { path: PathBuf },

    #[error("Malformed Address Library stream at record {record}{}: {message}", file_suffix(path))]
    MalformedStream {
        record: usize,
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Address of Address Library ID {id} overflows: base 0x{base:X} + offset 0x{offset:X}")]
    AddressOverflow { id: u64, base: usize, offset: u64 },

    #[error("Failed to find offset for Address Library ID {id} (game version {version})")]
    IdNotFound { id: u64, version: Version },

    #[error("No Address Library found for {loader} {version} in {}", dir.display())]
    NoDatabaseFound {
        loader: String,
        version: Version,
        dir: PathBuf,
    },

    #[error("No script extender loader configured; set `loader` to locate a database")]
    LoaderNotConfigured,

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn file_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Error::FileNotOpenable { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Whether the error aborts a whole database load, as opposed to a single lookup.
    pub fn is_fatal_for_load(&self) -> bool {
        !matches!(self, Error::IdNotFound { .. } | Error::AddressOverflow { .. })
    }

    /// Attach the database file to format, version and stream errors that
    /// were raised without one. Other errors are returned unchanged.
    pub fn in_file(mut self, file: &Path) -> Self {
        if let Error::UnsupportedFormat { path, .. }
        | Error::VersionMismatch { path, .. }
        | Error::MalformedStream { path, .. } = &mut self
        {
            path.get_or_insert_with(|| file.to_path_buf());
        }
        self
    }

    pub(crate) fn malformed(record: usize, message: impl Into<String>) -> Self {
        Error::MalformedStream {
            record,
            message: message.into(),
            path: None,
        }
    }
}
