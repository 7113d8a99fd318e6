//! Centralized path utilities
//!
//! All application paths in one place for consistency

use std::path::PathBuf;

use crate::constants::app;

/// Get the pluginscout config directory (~/.pluginscout)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app::CONFIG_DIR_NAME)
}

/// Get the config file path
///
/// `PLUGINSCOUT_CONFIG` wins over ~/.pluginscout/config.toml
pub fn config_file() -> PathBuf {
    match std::env::var_os(app::CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => config_dir().join(app::CONFIG_FILE_NAME),
    }
}
