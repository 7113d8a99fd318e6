//! Feature flag evaluation
//!
//! Two providers: `static` answers from the `[feature_toggles]` config table,
//! `goff` asks a remote OFREP service. Both share an evaluation context made
//! of a targeting key and free-form attributes.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::cdn::join_path;
use crate::config::{FlagProviderKind, OpenFeatureConfig};
use crate::constants;

const OFREP_FLAGS_PATH: &str = "ofrep/v1/evaluate/flags";
const STATIC_REASON: &str = "STATIC";

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag {key} not found")]
    NotFound { key: String },
    #[error("provider {provider} requires openfeature.url")]
    MissingUrl { provider: &'static str },
    #[error("invalid flag provider URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("flag provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("flag provider returned HTTP {status}")]
    Remote { status: StatusCode },
    #[error("flag provider sent an unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("flag {key} did not evaluate to a boolean")]
    NotBoolean { key: String },
}

/// Targeting key plus attributes, sent as the OFREP `context`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationContext {
    #[serde(rename = "targetingKey")]
    pub targeting_key: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl EvaluationContext {
    pub fn from_config(config: &OpenFeatureConfig) -> Self {
        let mut attributes = config.context.clone();
        attributes
            .entry("app_version".to_string())
            .or_insert_with(|| constants::app::VERSION.to_string());

        Self {
            targeting_key: config
                .targeting_key
                .clone()
                .unwrap_or_else(|| config.app_url.clone()),
            attributes,
        }
    }
}

/// Outcome of evaluating one boolean flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEvaluation {
    pub key: String,
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub reason: String,
}

/// Per-flag state in the bulk response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagState {
    pub variation_type: String,
    pub timestamp: i64,
    pub track_events: bool,
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllFlags {
    pub flags: BTreeMap<String, FlagState>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvaluation {
    key: String,
    value: serde_json::Value,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    reason: String,
}

impl RemoteEvaluation {
    fn into_evaluation(self) -> Result<FlagEvaluation, FlagError> {
        let value = self
            .value
            .as_bool()
            .ok_or_else(|| FlagError::NotBoolean {
                key: self.key.clone(),
            })?;
        Ok(FlagEvaluation {
            key: self.key,
            value,
            variant: self.variant,
            reason: self.reason,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RemoteBulk {
    #[serde(default)]
    flags: Vec<RemoteEvaluation>,
}

#[derive(Debug, Clone)]
enum Provider {
    Static(BTreeMap<String, bool>),
    Remote(Url),
}

/// Evaluates boolean feature flags against the configured provider
#[derive(Debug, Clone)]
pub struct FlagService {
    provider: Provider,
    context: EvaluationContext,
    client: reqwest::Client,
}

impl FlagService {
    pub fn from_config(
        config: &OpenFeatureConfig,
        toggles: &BTreeMap<String, bool>,
        client: reqwest::Client,
    ) -> Result<Self, FlagError> {
        let provider = match config.provider {
            FlagProviderKind::Static => Provider::Static(toggles.clone()),
            FlagProviderKind::Goff => {
                let raw = config.url.as_deref().ok_or(FlagError::MissingUrl {
                    provider: FlagProviderKind::Goff.as_str(),
                })?;
                let url = Url::parse(raw).map_err(|source| FlagError::InvalidUrl {
                    url: raw.to_string(),
                    source,
                })?;
                Provider::Remote(url)
            }
        };

        debug!("Feature flags use the {} provider", config.provider.as_str());
        Ok(Self {
            provider,
            context: EvaluationContext::from_config(config),
            client,
        })
    }

    pub fn provider_kind(&self) -> FlagProviderKind {
        match self.provider {
            Provider::Static(_) => FlagProviderKind::Static,
            Provider::Remote(_) => FlagProviderKind::Goff,
        }
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub async fn eval_flag(&self, key: &str) -> Result<FlagEvaluation, FlagError> {
        match &self.provider {
            Provider::Static(toggles) => {
                let value = *toggles.get(key).ok_or_else(|| FlagError::NotFound {
                    key: key.to_string(),
                })?;
                Ok(FlagEvaluation {
                    key: key.to_string(),
                    value,
                    variant: Some(variant_name(value).to_string()),
                    reason: STATIC_REASON.to_string(),
                })
            }
            Provider::Remote(base) => {
                let url = self.ofrep_url(base, &format!("{OFREP_FLAGS_PATH}/{key}"))?;
                let response = self
                    .client
                    .post(url)
                    .json(&serde_json::json!({ "context": self.context }))
                    .send()
                    .await?;

                match response.status() {
                    StatusCode::NOT_FOUND => Err(FlagError::NotFound {
                        key: key.to_string(),
                    }),
                    status if !status.is_success() => {
                        warn!("Flag provider returned {} for {}", status, key);
                        Err(FlagError::Remote { status })
                    }
                    _ => response.json::<RemoteEvaluation>().await?.into_evaluation(),
                }
            }
        }
    }

    pub async fn eval_all_flags(&self) -> Result<AllFlags, FlagError> {
        let now = chrono::Utc::now().timestamp();

        match &self.provider {
            Provider::Static(toggles) => Ok(AllFlags {
                flags: toggles
                    .iter()
                    .map(|(key, value)| (key.clone(), flag_state(variant_name(*value), *value, now)))
                    .collect(),
            }),
            Provider::Remote(_) => {
                let body = serde_json::to_vec(&serde_json::json!({ "context": self.context }))?;
                let (status, body) = self.forward_bulk(Bytes::from(body)).await?;
                if !status.is_success() {
                    return Err(FlagError::Remote { status });
                }

                let bulk: RemoteBulk = serde_json::from_slice(&body)?;
                let mut flags = BTreeMap::new();
                for remote in bulk.flags {
                    match remote.into_evaluation() {
                        Ok(eval) => {
                            let variant = eval.variant.unwrap_or_default();
                            flags.insert(eval.key, flag_state(&variant, eval.value, now));
                        }
                        Err(err) => warn!("Skipping flag: {}", err),
                    }
                }
                Ok(AllFlags { flags })
            }
        }
    }

    /// Send a raw bulk evaluation request to the remote provider and relay
    /// its status and body untouched.
    pub async fn forward_bulk(&self, body: Bytes) -> Result<(StatusCode, Bytes), FlagError> {
        let Provider::Remote(base) = &self.provider else {
            return Err(FlagError::MissingUrl {
                provider: FlagProviderKind::Static.as_str(),
            });
        };

        let url = self.ofrep_url(base, OFREP_FLAGS_PATH)?;
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.bytes().await?))
    }

    fn ofrep_url(&self, base: &Url, path: &str) -> Result<Url, FlagError> {
        join_path(base, path).map_err(|source| FlagError::InvalidUrl {
            url: base.to_string(),
            source,
        })
    }
}

fn variant_name(value: bool) -> &'static str {
    if value {
        "enabled"
    } else {
        "disabled"
    }
}

fn flag_state(variant: &str, value: bool, timestamp: i64) -> FlagState {
    FlagState {
        variation_type: variant.to_string(),
        timestamp,
        track_events: false,
        value,
    }
}
