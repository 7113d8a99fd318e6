//! pluginscout core
//!
//! Discovers plugin manifests hosted on a CDN, resolves their nested
//! includes and plugin dependencies into bundles, and backs the plugin
//! catalog, managed-plugin listing, and feature-flag evaluation used by the
//! server and CLI.

pub mod cdn;
pub mod config;
pub mod constants;
pub mod finder;
pub mod flags;
pub mod metrics;
pub mod paths;
pub mod plugins;
pub mod registry;

pub use cdn::{CdnUrls, UrlConstructor};
pub use config::Config;
pub use finder::{CdnFinder, FetchError, FinderSettings};
pub use metrics::FindMetrics;
pub use plugins::{
    CdnSource, FoundBundle, FoundPlugin, Manifest, PluginClass, PluginSource, RemoteFs,
};
pub use registry::{CatalogService, PluginRegistry, RegistryError};
