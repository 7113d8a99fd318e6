use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use super::PluginRegistry;

/// Source of the plugin ids this instance manages
#[async_trait]
pub trait ManagedPlugins: Send + Sync {
    async fn managed_plugins(&self) -> Vec<String>;
}

/// Manages every plugin the registry offers
#[derive(Clone)]
pub struct RegistryManagedPlugins {
    registry: Arc<dyn PluginRegistry>,
}

impl RegistryManagedPlugins {
    pub fn new(registry: Arc<dyn PluginRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ManagedPlugins for RegistryManagedPlugins {
    async fn managed_plugins(&self) -> Vec<String> {
        match self.registry.available_plugins().await {
            Ok(plugins) => plugins.into_iter().map(|plugin| plugin.id).collect(),
            Err(err) => {
                error!("Error getting available plugins: {}", err);
                Vec::new()
            }
        }
    }
}
