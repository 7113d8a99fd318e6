use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use url::Url;

use crate::cdn::join_path;
use crate::finder::FetchError;

/// Read-only view of files under a remote plugin root
#[derive(Clone)]
pub struct RemoteFs {
    base: Url,
    client: reqwest::Client,
}

impl RemoteFs {
    pub fn new(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetch one file relative to the plugin root
    pub async fn read(&self, path: &str) -> Result<Bytes, FetchError> {
        let url = join_path(&self.base, path).map_err(|source| FetchError::Url {
            url: self.base.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound { url }),
            status if !status.is_success() => Err(FetchError::Status { url, status }),
            _ => response
                .bytes()
                .await
                .map_err(|source| FetchError::Request { url, source }),
        }
    }
}

impl std::fmt::Debug for RemoteFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFs")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl Serialize for RemoteFs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.base.as_str())
    }
}
