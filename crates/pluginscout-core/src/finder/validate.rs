//! Source URL validation

use std::collections::BTreeMap;

use tracing::warn;
use url::Url;

/// Keep well-formed absolute http(s) URLs, deduplicated by their raw string.
///
/// `https://cdn/a` and `https://cdn/a/` are different entries; only exact
/// repeats collapse. Invalid entries are logged and dropped.
pub fn valid_urls(raw: &[String]) -> Vec<Url> {
    let mut seen: BTreeMap<&str, Url> = BTreeMap::new();

    for candidate in raw {
        if !candidate.starts_with("http") {
            warn!(
                "Skipping finding plugins as path is invalid URL: {}",
                candidate
            );
            continue;
        }

        let parsed = match Url::parse(candidate) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                warn!(
                    "Skipping finding plugins as {} has unsupported scheme {}",
                    candidate,
                    url.scheme()
                );
                continue;
            }
            Err(err) => {
                warn!(
                    "Skipping finding plugins as path is invalid URL: {} ({})",
                    candidate, err
                );
                continue;
            }
        };

        seen.insert(candidate.as_str(), parsed);
    }

    seen.into_values().collect()
}
