//! Expansion of top-level manifests into bundles

use tokio_util::sync::CancellationToken;
use tracing::error;
use url::Url;

use super::CdnFinder;
use crate::cdn::parent_dir;
use crate::plugins::{FoundBundle, FoundPlugin, Manifest, PluginDependency, RemoteFs};

impl CdnFinder {
    /// Turn each found manifest into a bundle, followed by one childless
    /// bundle per plugin dependency that could be fetched.
    ///
    /// Nested and dependency fetches run one at a time, in declaration order.
    pub(super) async fn resolve_bundles(
        &self,
        found: impl IntoIterator<Item = (Url, Manifest)>,
        cancel: &CancellationToken,
    ) -> Vec<FoundBundle> {
        let mut bundles = Vec::new();

        for (base, manifest) in found {
            let children = self.resolve_includes(&manifest, cancel).await;
            let dependencies = manifest.dependencies.plugins.clone();

            bundles.push(FoundBundle {
                primary: FoundPlugin {
                    manifest,
                    fs: self.remote_fs(base),
                },
                children,
            });

            for dependency in &dependencies {
                if let Some(bundle) = self.resolve_dependency(dependency, cancel).await {
                    bundles.push(bundle);
                }
            }
        }

        bundles
    }

    async fn resolve_includes(
        &self,
        manifest: &Manifest,
        cancel: &CancellationToken,
    ) -> Vec<FoundPlugin> {
        let constructor = self.cdn.constructor(&manifest.id, manifest.version());
        let mut children = Vec::new();

        for include in manifest.nested_includes() {
            let base = match constructor.path(parent_dir(&include.path)) {
                Ok(url) => url,
                Err(err) => {
                    error!(
                        "Could not get URL for nested plugin {} of {}: {}",
                        include.name, manifest.id, err
                    );
                    continue;
                }
            };

            match self.fetcher.fetch(&base, cancel).await {
                Ok(nested) => children.push(FoundPlugin {
                    manifest: nested,
                    fs: self.remote_fs(base),
                }),
                Err(err) => {
                    error!(
                        "Could not fetch nested plugin {} ({}) of {}: {}",
                        include.name, include.path, manifest.id, err
                    );
                }
            }
        }

        children
    }

    async fn resolve_dependency(
        &self,
        dependency: &PluginDependency,
        cancel: &CancellationToken,
    ) -> Option<FoundBundle> {
        let base = match self
            .cdn
            .constructor(&dependency.id, &dependency.version)
            .path("")
        {
            Ok(url) => url,
            Err(err) => {
                error!(
                    "Could not get URL for plugin dependency {}@{}: {}",
                    dependency.id, dependency.version, err
                );
                return None;
            }
        };

        match self.fetcher.fetch(&base, cancel).await {
            Ok(manifest) => Some(FoundBundle {
                primary: FoundPlugin {
                    manifest,
                    fs: self.remote_fs(base),
                },
                children: Vec::new(),
            }),
            Err(err) => {
                error!(
                    "Could not fetch plugin dependency {}@{}: {}",
                    dependency.id, dependency.version, err
                );
                None
            }
        }
    }

    fn remote_fs(&self, base: Url) -> RemoteFs {
        RemoteFs::new(base, self.fetcher.client().clone())
    }
}
