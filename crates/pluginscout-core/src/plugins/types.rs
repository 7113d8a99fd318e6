use serde::{Deserialize, Serialize};

use super::RemoteFs;

/// Include types that point at a nested plugin with its own manifest
const NESTED_INCLUDE_TYPES: [&str; 2] = ["panel", "datasource"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Panel,
    Datasource,
    App,
    Renderer,
    #[serde(rename = "secretsmanager")]
    SecretsManager,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Panel => "panel",
            PluginType::Datasource => "datasource",
            PluginType::App => "app",
            PluginType::Renderer => "renderer",
            PluginType::SecretsManager => "secretsmanager",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// A sub-asset declared by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Include {
    #[serde(rename = "type", default)]
    pub include_type: String,
    #[serde(default)]
    pub name: String,
    /// Relative to the plugin root
    #[serde(default)]
    pub path: String,
}

impl Include {
    /// Whether this include is a nested plugin that should be fetched as a child
    pub fn is_nested_plugin(&self) -> bool {
        NESTED_INCLUDE_TYPES.contains(&self.include_type.as_str()) && !self.path.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginDependency {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dependencies {
    /// Version range of the host application the plugin supports
    #[serde(
        rename = "grafanaDependency",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub host_dependency: Option<String>,
    #[serde(default)]
    pub plugins: Vec<PluginDependency>,
}

/// Parsed `plugin.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub includes: Vec<Include>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub backend: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}

impl Manifest {
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Includes that resolve to nested plugins, in declaration order
    pub fn nested_includes(&self) -> impl Iterator<Item = &Include> {
        self.includes.iter().filter(|include| include.is_nested_plugin())
    }
}

/// Where a source's plugins come from; also the metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginClass {
    Core,
    External,
    Cdn,
}

impl PluginClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginClass::Core => "core",
            PluginClass::External => "external",
            PluginClass::Cdn => "cdn",
        }
    }
}

impl std::fmt::Display for PluginClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Internal,
    Valid,
    Invalid,
    Modified,
    Unsigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub status: SignatureStatus,
}

/// A manifest together with a handle on the location it was fetched from
#[derive(Debug, Clone, Serialize)]
pub struct FoundPlugin {
    pub manifest: Manifest,
    #[serde(rename = "baseUrl")]
    pub fs: RemoteFs,
}

/// A primary plugin and the nested plugins it includes
#[derive(Debug, Clone, Serialize)]
pub struct FoundBundle {
    pub primary: FoundPlugin,
    pub children: Vec<FoundPlugin>,
}

impl FoundBundle {
    pub fn id(&self) -> &str {
        &self.primary.manifest.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_panel_and_datasource_includes_are_nested() {
        let include = |include_type: &str, path: &str| Include {
            include_type: include_type.to_string(),
            name: "x".to_string(),
            path: path.to_string(),
        };

        assert!(include("panel", "panels/a/plugin.json").is_nested_plugin());
        assert!(include("datasource", "datasource/plugin.json").is_nested_plugin());
        assert!(!include("alerting", "alerting/plugin.json").is_nested_plugin());
        assert!(!include("page", "pages/home").is_nested_plugin());
        assert!(!include("panel", "").is_nested_plugin());
    }

    #[test]
    fn class_labels_are_stable() {
        assert_eq!(PluginClass::Cdn.as_str(), "cdn");
        assert_eq!(PluginClass::External.to_string(), "external");
    }
}
