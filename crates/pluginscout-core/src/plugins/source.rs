use super::{PluginClass, Signature, SignatureStatus};

/// Somewhere plugins can be discovered from
pub trait PluginSource: Send + Sync {
    fn plugin_class(&self) -> PluginClass;

    /// Base locations to probe for a manifest
    fn plugin_uris(&self) -> Vec<String>;

    /// Signature to assume for a plugin from this source, if any
    fn default_signature(&self, plugin_id: &str) -> Option<Signature>;
}

/// Plugins served from a CDN
#[derive(Debug, Clone, Default)]
pub struct CdnSource {
    urls: Vec<String>,
}

impl CdnSource {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
        }
    }
}

impl PluginSource for CdnSource {
    fn plugin_class(&self) -> PluginClass {
        PluginClass::Cdn
    }

    fn plugin_uris(&self) -> Vec<String> {
        self.urls.clone()
    }

    fn default_signature(&self, _plugin_id: &str) -> Option<Signature> {
        Some(Signature {
            status: SignatureStatus::Valid,
        })
    }
}
