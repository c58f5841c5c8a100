//! CLI command implementations.
//!
//! Every command loads at most one database through [`source::open`] and
//! prints plain text to stdout.

pub mod convert;
pub mod hex_utils;
pub mod info;
pub mod locate;
pub mod lookup;
pub mod reverse;
pub mod source;

use addrlib_core::{DatabaseConfig, SharedCache, Version};

/// State shared by all commands
pub struct Context<'a> {
    pub config: DatabaseConfig,
    /// `--game-version`, if given
    pub version: Option<Version>,
    pub cache: &'a SharedCache,
    /// `--legacy`: explicit `.bin` files are headerless v0 tables
    pub legacy: bool,
}

impl<'a> Context<'a> {
    pub fn new(config: DatabaseConfig, version: Option<Version>, cache: &'a SharedCache) -> Self {
        Self {
            config,
            version,
            cache,
            legacy: false,
        }
    }

    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }
}
