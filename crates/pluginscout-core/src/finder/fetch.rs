//! Manifest fetching
//!
//! One GET of `{base}/plugin.json` per call. No retries: a failure is final
//! for that location within a discovery run.

use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use crate::cdn::join_path;
use crate::plugins::{read_plugin_json, Manifest, ManifestError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("plugin.json not found at {url}")]
    NotFound { url: Url },
    #[error("could not retrieve plugin.json from {url}: HTTP {status}")]
    Status { url: Url, status: StatusCode },
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not read plugin.json from {url}: {source}")]
    Parse {
        url: Url,
        #[source]
        source: ManifestError,
    },
    #[error("request to {url} was cancelled")]
    Cancelled { url: Url },
    #[error("could not build URL from {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl FetchError {
    /// The manifest is absent, as opposed to unreachable or broken
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}

/// Fetches and parses manifests with a shared HTTP client
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: reqwest::Client,
    manifest_file: String,
}

impl ManifestFetcher {
    pub fn new(client: reqwest::Client, manifest_file: impl Into<String>) -> Self {
        Self {
            client,
            manifest_file: manifest_file.into(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch the manifest under `base`.
    ///
    /// Cancelling `cancel` aborts the request and yields
    /// [`FetchError::Cancelled`]; the response is dropped on every path.
    pub async fn fetch(
        &self,
        base: &Url,
        cancel: &CancellationToken,
    ) -> Result<Manifest, FetchError> {
        let url = join_path(base, &self.manifest_file).map_err(|source| FetchError::Url {
            url: base.to_string(),
            source,
        })?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled { url }),
            result = self.client.get(url.clone()).send() => match result {
                Ok(response) => response,
                Err(source) => {
                    warn!("Error occurred when fetching {}: {}", url, source);
                    return Err(FetchError::Request { url, source });
                }
            },
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { url });
        }
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled { url }),
            result = response.bytes() => match result {
                Ok(body) => body,
                Err(source) => {
                    warn!("Error occurred when reading body from {}: {}", url, source);
                    return Err(FetchError::Request { url, source });
                }
            },
        };

        read_plugin_json(&body).map_err(|source| {
            warn!("Error occurred when reading plugin.json from {}: {}", url, source);
            FetchError::Parse { url, source }
        })
    }
}
