//! Database loading configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::database::{Blacklist, BlacklistEntry, Loader};
use crate::database::layout::region;
use crate::error::Result;
use crate::version::Version;

/// Configuration for locating and loading an Address Library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory searched for `<root>-<version>.bin|csv`
    pub search_dir: PathBuf,
    /// Loader whose naming rules and blacklist apply
    pub loader: Option<Loader>,
    /// Prefix of shared region names
    pub region_prefix: String,
    /// Whether to reject known-bad snapshots
    pub verify_blacklist: bool,
    /// Extra known-bad snapshots on top of the loader's built-in list
    pub extra_blacklist: Vec<BlacklistEntry>,
    /// JSON file with more known-bad snapshots
    pub blacklist_file: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            search_dir: PathBuf::from("."),
            loader: None,
            region_prefix: region::DEFAULT_PREFIX.to_string(),
            verify_blacklist: true,
            extra_blacklist: Vec::new(),
            blacklist_file: None,
        }
    }
}

impl DatabaseConfig {
    /// Create a new configuration builder
    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }

    /// Shared region name for `version`, e.g. `ADDRLIB_IDDB_OFFSETS_1_6_1170_0`
    pub fn region_name(&self, version: Version) -> String {
        format!("{}{}", self.region_prefix, version.to_string_with("_"))
    }

    /// Built-in entries for the configured loader plus the extra ones
    pub fn blacklist(&self) -> Result<Blacklist> {
        let mut list = self.loader.map(Blacklist::builtin).unwrap_or_default();
        list.extend(self.extra_blacklist.iter().cloned());
        if let Some(path) = &self.blacklist_file {
            list.extend(Blacklist::load_json(path)?.entries().iter().cloned());
        }
        Ok(list)
    }
}

/// Builder for DatabaseConfig
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigBuilder {
    search_dir: Option<PathBuf>,
    loader: Option<Loader>,
    region_prefix: Option<String>,
    verify_blacklist: Option<bool>,
    extra_blacklist: Vec<BlacklistEntry>,
    blacklist_file: Option<PathBuf>,
}

impl DatabaseConfigBuilder {
    /// Set the directory searched for database files
    pub fn search_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.search_dir = Some(path.into());
        self
    }

    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn region_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.region_prefix = Some(prefix.into());
        self
    }

    /// Enable or disable the known-bad snapshot check
    pub fn verify_blacklist(mut self, enabled: bool) -> Self {
        self.verify_blacklist = Some(enabled);
        self
    }

    pub fn blacklist_entry(mut self, entry: BlacklistEntry) -> Self {
        self.extra_blacklist.push(entry);
        self
    }

    pub fn blacklist_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.blacklist_file = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatabaseConfig {
        let default = DatabaseConfig::default();
        DatabaseConfig {
            search_dir: self.search_dir.unwrap_or(default.search_dir),
            loader: self.loader.or(default.loader),
            region_prefix: self.region_prefix.unwrap_or(default.region_prefix),
            verify_blacklist: self.verify_blacklist.unwrap_or(default.verify_blacklist),
            extra_blacklist: self.extra_blacklist,
            blacklist_file: self.blacklist_file,
        }
    }
}
