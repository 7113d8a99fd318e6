use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CatalogPlugin, PluginRegistry, RegistryError};
use crate::finder::CdnFinder;
use crate::plugins::{CdnSource, FoundPlugin};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogSignature {
    #[serde(rename = "type", default)]
    pub signature_type: String,
    #[serde(default)]
    pub org_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginVersionEntry {
    #[serde(default)]
    pub backend: bool,
    #[serde(default)]
    pub origin_zip_url: String,
    #[serde(default)]
    pub signature: CatalogSignature,
}

/// `plugins.json`: plugin id -> version -> release metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginList {
    #[serde(default)]
    pub plugins: BTreeMap<String, BTreeMap<String, PluginVersionEntry>>,
}

/// Catalog backed by a `plugins.json` file, read once at startup
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: BTreeMap<String, CatalogPlugin>,
    finder: CdnFinder,
}

impl CatalogService {
    pub async fn load(path: &Path, finder: CdnFinder) -> Result<Self, CatalogError> {
        let bytes = fs::read(path).await.map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let list: PluginList =
            serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let service = Self::from_list(list, finder);
        info!(
            "Loaded {} plugins from catalog {}",
            service.store.len(),
            path.display()
        );
        Ok(service)
    }

    pub fn from_list(list: PluginList, finder: CdnFinder) -> Self {
        let mut store = BTreeMap::new();

        for (id, versions) in list.plugins {
            let Some(version) = latest_version(versions.keys().map(String::as_str)) else {
                warn!("Skipping catalog plugin {} with no versions", id);
                continue;
            };

            let url = match finder.cdn().constructor(&id, &version).path("") {
                Ok(url) => url.to_string(),
                Err(err) => {
                    warn!("Skipping catalog plugin {}@{}: {}", id, version, err);
                    continue;
                }
            };

            store.insert(id.clone(), CatalogPlugin { id, version, url });
        }

        Self { store, finder }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl PluginRegistry for CatalogService {
    async fn available_plugins(&self) -> Result<Vec<CatalogPlugin>, RegistryError> {
        Ok(self.store.values().cloned().collect())
    }

    async fn get_plugin(&self, id: &str) -> Option<CatalogPlugin> {
        self.store.get(id).cloned()
    }

    async fn find_plugin(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<FoundPlugin, RegistryError> {
        let plugin = self
            .get_plugin(id)
            .await
            .ok_or_else(|| RegistryError::NotInStore { id: id.to_string() })?;

        let finder = self.finder.clone().with_concurrency(true);
        let bundles = finder.find(&CdnSource::single(plugin.url), cancel).await;

        if bundles.len() > 1 {
            return Err(RegistryError::MultipleFound {
                id: id.to_string(),
                count: bundles.len(),
            });
        }

        bundles
            .into_iter()
            .next()
            .map(|bundle| bundle.primary)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    async fn set_plugin_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        debug!(
            "Ignoring enabled={} for plugin {}: catalog is read-only",
            enabled, id
        );
        Ok(())
    }
}

/// Pick the greatest semantic version.
///
/// Unparseable versions never replace a parseable one; if nothing parses
/// the first version seen wins.
pub fn latest_version<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut best: Option<(&str, Option<Version>)> = None;

    for candidate in versions {
        let parsed = parse_lenient(candidate);
        best = match best {
            None => Some((candidate, parsed)),
            Some((current, current_parsed)) => {
                let newer = match (&current_parsed, &parsed) {
                    (Some(current_version), Some(version)) => version > current_version,
                    (None, Some(_)) => true,
                    _ => false,
                };
                if newer {
                    Some((candidate, parsed))
                } else {
                    Some((current, current_parsed))
                }
            }
        };
    }

    best.map(|(version, _)| version.to_string())
}

/// Accepts `v1.2.3`, `1.2`, and `1` alongside strict semver
fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let components = trimmed.split('.').count();
    let padded = match components {
        1 => format!("{trimmed}.0.0"),
        2 => format!("{trimmed}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::CdnUrls;
    use crate::finder::FinderSettings;
    use tempfile::tempdir;

    fn finder() -> CdnFinder {
        CdnFinder::with_client(
            reqwest::Client::new(),
            FinderSettings::default(),
            CdnUrls::new("https://cdn.test/{id}/{version}"),
        )
    }

    #[test]
    fn latest_version_compares_semantically() {
        assert_eq!(
            latest_version(["1.9.0", "1.10.0", "1.2.0"]).as_deref(),
            Some("1.10.0")
        );
        assert_eq!(
            latest_version(["2.0.0-beta.1", "1.9.9"]).as_deref(),
            Some("2.0.0-beta.1")
        );
        assert_eq!(latest_version(["v3", "2.5.1"]).as_deref(), Some("v3"));
        assert_eq!(latest_version(Vec::<&str>::new()), None);
    }

    #[test]
    fn unparseable_versions_never_win() {
        assert_eq!(
            latest_version(["garbage", "1.0.0", "zzz"]).as_deref(),
            Some("1.0.0")
        );
        assert_eq!(latest_version(["beta", "alpha"]).as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn loads_latest_version_per_plugin() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("plugins.json");
        fs::write(
            &path,
            r#"{
                "plugins": {
                    "acme-panel": {
                        "1.0.0": { "backend": false, "origin_zip_url": "https://z/1.zip", "signature": { "type": "community", "org_name": "acme" } },
                        "1.2.0": { "backend": false, "origin_zip_url": "https://z/2.zip", "signature": { "type": "community", "org_name": "acme" } }
                    },
                    "acme-datasource": {
                        "0.9.0": {}
                    }
                }
            }"#,
        )
        .await
        .expect("write catalog");

        let catalog = CatalogService::load(&path, finder()).await.expect("load");
        let available = catalog.available_plugins().await.expect("available");

        assert_eq!(available.len(), 2);
        assert_eq!(available[0].id, "acme-datasource");
        assert_eq!(available[1].id, "acme-panel");
        assert_eq!(available[1].version, "1.2.0");
        assert_eq!(
            available[1].url,
            "https://cdn.test/acme-panel/1.2.0/public/plugins/acme-panel"
        );
    }

    #[tokio::test]
    async fn missing_catalog_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let err = CatalogService::load(&temp.path().join("plugins.json"), finder())
            .await
            .expect_err("missing file");
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[tokio::test]
    async fn find_plugin_outside_catalog_is_not_in_store() {
        let catalog = CatalogService::from_list(PluginList::default(), finder());
        let err = catalog
            .find_plugin("nope", &CancellationToken::new())
            .await
            .expect_err("not in store");
        assert!(matches!(err, RegistryError::NotInStore { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_plugin_enabled_is_accepted() {
        let catalog = CatalogService::from_list(PluginList::default(), finder());
        catalog
            .set_plugin_enabled("anything", false)
            .await
            .expect("accepted");
    }
}
