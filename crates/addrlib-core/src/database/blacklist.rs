//! Known-bad database snapshots, identified by SHA-512 of the loaded region.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::{debug, warn};

use crate::database::loader::Loader;
use crate::error::{Error, Result};
use crate::shared::Region;
use crate::version::Version;

/// Upper-case hex SHA-512 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    Sha512::digest(bytes)
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub version: Version,
    /// Hex SHA-512, compared case-insensitively
    pub sha512: String,
}

impl BlacklistEntry {
    pub fn new(version: Version, sha512: impl Into<String>) -> Self {
        Self {
            version,
            sha512: sha512.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blacklist {
    entries: Vec<BlacklistEntry>,
}

impl Blacklist {
    pub fn new(entries: Vec<BlacklistEntry>) -> Self {
        Self { entries }
    }

    /// Snapshots known to be corrupt for `loader`
    pub fn builtin(loader: Loader) -> Self {
        let entries = match loader {
            Loader::F4se => vec![
                BlacklistEntry::new(
                    Version::new(1, 10, 980, 0),
                    "2AD60B95388F1B6E77A6F86F17BEB51D043CF95A341E91ECB2E911A393E45FE8156D585D2562F7B14434483D6E6652E2373B91589013507CABAE596C26A343F1",
                ),
                BlacklistEntry::new(
                    Version::new(1, 11, 159, 0),
                    "686D40387F638ED75AD43BB76CA14170576F1A30E91144F280987D13A3012B1CA6A4E04E6BE7A5B99E46C50332C49BE40C3D9448038E17D3D31C40E72A90AE26",
                ),
            ],
            Loader::Skse | Loader::Sfse | Loader::Obse => Vec::new(),
        };
        Self { entries }
    }

    /// Read a JSON array of `{"version": "...", "sha512": "..."}` entries.
    pub fn load_json(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::FileNotOpenable {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<BlacklistEntry> = serde_json::from_reader(BufReader::new(file))?;
        debug!("Loaded {} blacklist entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = BlacklistEntry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[BlacklistEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail with [`Error::BlacklistedDatabase`] if `region` matches an entry for `version`.
    ///
    /// The region is only hashed when some entry targets `version`.
    pub fn check(&self, region: &Region, version: Version, path: &Path) -> Result<()> {
        let mut candidates = self
            .entries
            .iter()
            .filter(|entry| entry.version == version)
            .peekable();
        if candidates.peek().is_none() {
            return Ok(());
        }

        let hash = content_hash(region.as_bytes());
        debug!("Address Library hash for {}: {}", version, hash);
        if candidates.any(|entry| entry.sha512.eq_ignore_ascii_case(&hash)) {
            warn!(
                "Blacklisted Address Library loaded from {} for game version {}",
                path.display(),
                version
            );
            return Err(Error::BlacklistedDatabase {
                path: path.to_path_buf(),
                version,
            });
        }

        Ok(())
    }
}
