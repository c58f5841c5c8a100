//! TOML configuration file plus command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use addrlib_core::{DatabaseConfig, Loader};
use anyhow::{Context, Result};
use tracing::info;

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub loader: Option<Loader>,
    pub search_dir: Option<PathBuf>,
    pub no_verify: bool,
}

/// Parse a config file. Missing keys keep their defaults.
pub fn load(path: &Path) -> Result<DatabaseConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: DatabaseConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// The effective configuration for this run
pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<DatabaseConfig> {
    let mut config = match path {
        Some(path) => load(path)?,
        None => DatabaseConfig::default(),
    };

    if let Some(loader) = overrides.loader {
        config.loader = Some(loader);
    }
    if let Some(dir) = &overrides.search_dir {
        config.search_dir = dir.clone();
    }
    if overrides.no_verify {
        config.verify_blacklist = false;
    }
    Ok(config)
}
