// src/config.rs

//! Configuration loading utilities.
//!
//! File config is TOML; recognized environment variables override it
//! afterwards, so a deployment can run with no file at all.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file is missing or unreadable; the
/// environment overrides are applied either way.
pub fn load_or_default(path: &Path) -> Config {
    let mut config = match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<Config>(&text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse config {}: {e}. Using defaults.", path.display());
                Config::default()
            }
        },
        Err(_) => {
            log::info!("No config file at {}; using defaults.", path.display());
            Config::default()
        }
    };
    config.apply_env();
    config
}

/// Load configuration and fail when it is not runnable.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = load_or_default(path);
    config.validate()?;
    Ok(config)
}
