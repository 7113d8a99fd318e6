use thiserror::Error;

use super::Manifest;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid plugin.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plugin.json does not declare an id")]
    MissingId,
}

/// Parse and validate a `plugin.json` body
pub fn read_plugin_json(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_slice(bytes)?;
    if manifest.id.trim().is_empty() {
        return Err(ManifestError::MissingId);
    }
    Ok(manifest)
}
