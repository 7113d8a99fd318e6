//! Configuration file parsing
//!
//! Reads `~/.pluginscout/config.toml` (or the file named by
//! `PLUGINSCOUT_CONFIG`). Every section is optional; a missing file means
//! defaults everywhere.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::constants;
use crate::finder::FinderSettings;
use crate::paths;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub finder: FinderConfig,
    pub features: Features,
    pub cdn: CdnConfig,
    pub catalog: CatalogConfig,
    /// Static feature flags, `name = bool`
    pub feature_toggles: BTreeMap<String, bool>,
    pub openfeature: OpenFeatureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub concurrency_limit: usize,
    pub request_timeout_secs: u64,
    pub manifest_file: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: constants::finder::CONCURRENCY_LIMIT,
            request_timeout_secs: constants::finder::REQUEST_TIMEOUT.as_secs(),
            manifest_file: constants::finder::MANIFEST_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Fetch top-level manifests concurrently instead of one at a time
    pub cdn_sync_loader: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    /// Base URL with `{id}` and `{version}` placeholders
    pub url_template: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            url_template: constants::cdn::DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::catalog::DEFAULT_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagProviderKind {
    #[default]
    Static,
    Goff,
}

impl FlagProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagProviderKind::Static => "static",
            FlagProviderKind::Goff => "goff",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFeatureConfig {
    pub provider: FlagProviderKind,
    /// Remote OFREP endpoint, required for the `goff` provider
    pub url: Option<String>,
    /// Falls back to `app_url` when unset
    pub targeting_key: Option<String>,
    pub app_url: String,
    /// Extra evaluation context attributes
    pub context: BTreeMap<String, String>,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file; a missing file yields defaults
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_toml(&content, path)
    }

    /// Load from the default location
    pub async fn load_default() -> Result<Self, ConfigError> {
        Self::load(&paths::config_file()).await
    }

    pub fn finder_settings(&self) -> FinderSettings {
        FinderSettings {
            concurrent: self.features.cdn_sync_loader,
            concurrency_limit: self.finder.concurrency_limit.max(1),
            request_timeout: Duration::from_secs(self.finder.request_timeout_secs.max(1)),
            manifest_file: self.finder.manifest_file.clone(),
        }
    }
}
