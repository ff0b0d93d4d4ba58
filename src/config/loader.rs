// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSyncConfig, SyncConfig};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated config.
///
/// Use [`load_and_validate`] unless you need to inspect invalid values.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSyncConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawSyncConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let raw_config = load_from_path(&path)?;
    let config = SyncConfig::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration to use.
///
/// - An explicit path must exist and be valid.
/// - Without one, [`default_config_path`] is used if present, otherwise the
///   built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<SyncConfig> {
    if let Some(path) = path {
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        debug!(path = %default_path.display(), "loading default config file");
        load_and_validate(default_path)
    } else {
        debug!("no config file found; using built-in defaults");
        Ok(SyncConfig::default())
    }
}

/// `Procsync.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Procsync.toml")
}
