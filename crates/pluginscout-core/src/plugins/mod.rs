//! Plugin manifests, sources, and discovery results.
//!
//! A plugin is described by its `plugin.json` manifest. Sources hand the
//! finder a list of base locations to probe; the finder hands back bundles
//! of found plugins, each carrying a read-only handle on where it was found.

mod fs;
mod manifest;
mod source;
mod types;

pub use fs::RemoteFs;
pub use manifest::{read_plugin_json, ManifestError};
pub use source::{CdnSource, PluginSource};
pub use types::{
    Author, Dependencies, FoundBundle, FoundPlugin, Include, Info, Manifest, PluginClass,
    PluginDependency, PluginType, Signature, SignatureStatus,
};
