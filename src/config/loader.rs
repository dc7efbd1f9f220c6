// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WildfireError};

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// path resolution and semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        WildfireError::ConfigError(format!("cannot read config {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Resolves a relative `[paths].home_dir` against the config file's
///   directory, then every other relative path against `home_dir`.
/// - Checks limits, thresholds, glob patterns, durations and classifier
///   markers.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;
    if raw_config.paths.home_dir.is_relative() {
        let config_dir = std::path::absolute(path)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        raw_config.paths.home_dir = config_dir.join(&raw_config.paths.home_dir);
    }
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}
