//! CDN plugin finder
//!
//! Discovery runs in three stages:
//! 1. validate and dedup the source's base URLs
//! 2. fetch every top-level manifest under a concurrency cap
//! 3. expand each manifest's nested includes and plugin dependencies
//!
//! Per-location failures are logged and dropped; discovery itself never
//! fails, callers just see fewer bundles.

mod dispatch;
mod fetch;
mod resolve;
mod validate;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use url::Url;

use crate::cdn::CdnUrls;
use crate::constants;
use crate::metrics::FindMetrics;
use crate::plugins::{FoundBundle, Manifest, PluginSource};

pub use dispatch::{dispatch, FetchOutcome};
pub use fetch::{FetchError, ManifestFetcher};
pub use validate::valid_urls;

/// Finder tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderSettings {
    /// Fetch top-level manifests concurrently; otherwise one at a time
    pub concurrent: bool,
    pub concurrency_limit: usize,
    pub request_timeout: Duration,
    pub manifest_file: String,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            concurrent: false,
            concurrency_limit: constants::finder::CONCURRENCY_LIMIT,
            request_timeout: constants::finder::REQUEST_TIMEOUT,
            manifest_file: constants::finder::MANIFEST_FILE.to_string(),
        }
    }
}

impl FinderSettings {
    pub fn concurrent() -> Self {
        Self {
            concurrent: true,
            ..Self::default()
        }
    }

    /// Number of fetches allowed in flight for `total` URLs
    pub fn dispatch_limit(&self, total: usize) -> usize {
        if self.concurrent {
            total.min(self.concurrency_limit).max(1)
        } else {
            1
        }
    }
}

/// Identity of a discovered plugin instance.
///
/// The same id and version served from two URLs are two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginKey {
    pub id: String,
    pub version: String,
    pub path: String,
}

/// Finds plugin bundles hosted on a CDN
#[derive(Debug, Clone)]
pub struct CdnFinder {
    settings: FinderSettings,
    cdn: CdnUrls,
    fetcher: ManifestFetcher,
    metrics: Arc<FindMetrics>,
}

impl CdnFinder {
    /// Build a finder with its own HTTP client.
    ///
    /// The client applies `request_timeout` to every request and picks up
    /// proxy settings from the environment.
    pub fn new(settings: FinderSettings, cdn: CdnUrls) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(constants::finder::USER_AGENT)
            .build()?;
        Ok(Self::with_client(client, settings, cdn))
    }

    pub fn with_client(client: reqwest::Client, settings: FinderSettings, cdn: CdnUrls) -> Self {
        let fetcher = ManifestFetcher::new(client, settings.manifest_file.clone());
        Self {
            settings,
            cdn,
            fetcher,
            metrics: FindMetrics::global(),
        }
    }

    /// Record into `metrics` instead of the process-wide sink
    pub fn with_metrics(mut self, metrics: Arc<FindMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn settings(&self) -> &FinderSettings {
        &self.settings
    }

    pub fn cdn(&self) -> &CdnUrls {
        &self.cdn
    }

    /// Same finder with concurrency switched on or off
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.settings.concurrent = concurrent;
        self
    }

    /// Discover every bundle reachable from `source`, sorted by plugin id.
    ///
    /// Equal ids keep the order the collection phase produced them in, which
    /// depends on fetch completion order. If two fetches share a
    /// [`PluginKey`] the one collected last wins.
    pub async fn find(
        &self,
        source: &dyn PluginSource,
        cancel: &CancellationToken,
    ) -> Vec<FoundBundle> {
        let class = source.plugin_class();
        let started = Instant::now();

        let urls = valid_urls(&source.plugin_uris());
        let mut bundles = if urls.is_empty() {
            Vec::new()
        } else {
            let limit = self.settings.dispatch_limit(urls.len());
            let outcomes = dispatch(&self.fetcher, urls, limit, cancel).await;
            let found = collect_found(outcomes);
            self.resolve_bundles(found.into_values(), cancel).await
        };

        bundles.sort_by(|a, b| a.id().cmp(b.id()));

        let elapsed = started.elapsed();
        self.metrics
            .observe(class.as_str(), bundles.len(), elapsed.as_secs_f64());
        debug!(
            "Plugin find complete: class={} total={} duration={:?}",
            class,
            bundles.len(),
            elapsed
        );

        bundles
    }
}

/// Key successful outcomes by [`PluginKey`], last write wins
fn collect_found(outcomes: Vec<FetchOutcome>) -> HashMap<PluginKey, (Url, Manifest)> {
    let mut found = HashMap::with_capacity(outcomes.len());

    for FetchOutcome { url, result } in outcomes {
        match result {
            Ok(manifest) => {
                let key = PluginKey {
                    id: manifest.id.clone(),
                    version: manifest.version().to_string(),
                    path: url.to_string(),
                };
                found.insert(key, (url, manifest));
            }
            Err(err) => {
                error!("Could not fetch plugin {}: {}", url, err);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::read_plugin_json;

    fn manifest(id: &str, version: &str, name: &str) -> Manifest {
        read_plugin_json(
            format!(
                r#"{{"id": "{id}", "type": "panel", "name": "{name}", "info": {{"version": "{version}"}}}}"#
            )
            .as_bytes(),
        )
        .expect("manifest")
    }

    fn outcome(url: &str, manifest: Manifest) -> FetchOutcome {
        FetchOutcome {
            url: Url::parse(url).expect("url"),
            result: Ok(manifest),
        }
    }

    #[test]
    fn dispatch_limit_respects_mode() {
        let sequential = FinderSettings::default();
        assert_eq!(sequential.dispatch_limit(100), 1);

        let concurrent = FinderSettings::concurrent();
        assert_eq!(concurrent.dispatch_limit(5), 5);
        assert_eq!(concurrent.dispatch_limit(100), 32);
        assert_eq!(concurrent.dispatch_limit(0), 1);
    }

    #[test]
    fn colliding_keys_collapse_to_last_collected() {
        let found = collect_found(vec![
            outcome("https://cdn/a", manifest("acme", "1.0.0", "first")),
            outcome("https://cdn/a", manifest("acme", "1.0.0", "second")),
        ]);

        assert_eq!(found.len(), 1);
        let (_, kept) = found.values().next().expect("one entry");
        assert_eq!(kept.name, "second");
    }

    #[test]
    fn same_plugin_from_different_paths_is_kept_twice() {
        let found = collect_found(vec![
            outcome("https://cdn/a", manifest("acme", "1.0.0", "a")),
            outcome("https://mirror/a", manifest("acme", "1.0.0", "b")),
            outcome("https://cdn/a", manifest("acme", "2.0.0", "c")),
        ]);

        assert_eq!(found.len(), 3);
    }

    #[test]
    fn failed_outcomes_are_dropped() {
        let url = Url::parse("https://cdn/missing").expect("url");
        let found = collect_found(vec![FetchOutcome {
            url: url.clone(),
            result: Err(FetchError::NotFound { url }),
        }]);

        assert!(found.is_empty());
    }
}
