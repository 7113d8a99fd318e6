//! Plugin catalog
//!
//! The catalog knows which plugins exist and their latest version; single
//! plugin lookups go through the finder against that plugin's CDN location.

mod catalog;
mod managed;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::plugins::FoundPlugin;

pub use catalog::{latest_version, CatalogError, CatalogService, PluginList, PluginVersionEntry};
pub use managed::{ManagedPlugins, RegistryManagedPlugins};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin {id} not found in catalog")]
    NotInStore { id: String },
    #[error("plugin {id} not found on CDN")]
    NotFound { id: String },
    #[error("multiple plugins found for {id} ({count} bundles)")]
    MultipleFound { id: String, count: usize },
    #[error("plugin registry unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotInStore { .. } | RegistryError::NotFound { .. }
        )
    }
}

/// Catalog entry: latest known version of a plugin and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPlugin {
    pub id: String,
    pub version: String,
    pub url: String,
}

#[async_trait]
pub trait PluginRegistry: Send + Sync {
    /// Every catalog entry, sorted by id
    async fn available_plugins(&self) -> Result<Vec<CatalogPlugin>, RegistryError>;

    async fn get_plugin(&self, id: &str) -> Option<CatalogPlugin>;

    /// Discover the single plugin behind a catalog entry
    async fn find_plugin(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<FoundPlugin, RegistryError>;

    async fn set_plugin_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError>;
}
