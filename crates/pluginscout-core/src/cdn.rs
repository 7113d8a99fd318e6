//! CDN URL construction
//!
//! Plugins on the CDN live under
//! `{template with id/version}/public/plugins/{id}/`.

use url::{ParseError, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnUrls {
    template: String,
}

impl CdnUrls {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn constructor(&self, plugin_id: &str, plugin_version: &str) -> UrlConstructor {
        UrlConstructor {
            template: self.template.clone(),
            plugin_id: plugin_id.to_string(),
            plugin_version: plugin_version.to_string(),
        }
    }
}

impl Default for CdnUrls {
    fn default() -> Self {
        Self::new(crate::constants::cdn::DEFAULT_URL_TEMPLATE)
    }
}

/// Builds URLs for assets of a single plugin version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlConstructor {
    template: String,
    plugin_id: String,
    plugin_version: String,
}

impl UrlConstructor {
    /// URL of `asset_path` inside the plugin root; empty means the root itself
    pub fn path(&self, asset_path: &str) -> Result<Url, ParseError> {
        let base = Url::parse(
            &self
                .template
                .replace("{id}", &self.plugin_id)
                .replace("{version}", &self.plugin_version),
        )?;

        let root = join_path(&base, &format!("public/plugins/{}", self.plugin_id))?;
        join_path(&root, asset_path)
    }
}

/// Append `/`-separated segments to the path of `base`.
///
/// Unlike [`Url::join`] the last segment of `base` is always kept, so
/// `https://cdn/a` + `plugin.json` is `https://cdn/a/plugin.json`.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url, ParseError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments.pop_if_empty();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => {
                    segments.push(other);
                }
            }
        }
    }
    Ok(url)
}

/// Directory part of a relative path; empty when there is none
pub(crate) fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => path[..idx].trim_end_matches('/'),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn join_keeps_last_segment() {
        assert_eq!(
            join_path(&url("https://cdn/a"), "plugin.json")
                .expect("join")
                .as_str(),
            "https://cdn/a/plugin.json"
        );
        assert_eq!(
            join_path(&url("https://cdn/a/"), "plugin.json")
                .expect("join")
                .as_str(),
            "https://cdn/a/plugin.json"
        );
        assert_eq!(
            join_path(&url("https://cdn/a/b"), "./x/../y/plugin.json")
                .expect("join")
                .as_str(),
            "https://cdn/a/b/y/plugin.json"
        );
    }

    #[test]
    fn parent_dir_matches_directory_semantics() {
        assert_eq!(parent_dir("panels/acme/plugin.json"), "panels/acme");
        assert_eq!(parent_dir("datasource/plugin.json"), "datasource");
        assert_eq!(parent_dir("panels/acme/"), "panels/acme");
        assert_eq!(parent_dir("a/b/"), "a/b");
        assert_eq!(parent_dir("plugin.json"), "");
        assert_eq!(parent_dir(""), "");
    }

    #[test]
    fn constructor_builds_plugin_root_and_assets() {
        let cdn = CdnUrls::new("https://cdn.test/{id}/{version}");
        let ctor = cdn.constructor("acme-app", "1.2.3");

        assert_eq!(
            ctor.path("").expect("root").as_str(),
            "https://cdn.test/acme-app/1.2.3/public/plugins/acme-app"
        );
        assert_eq!(
            ctor.path("panels/acme").expect("asset").as_str(),
            "https://cdn.test/acme-app/1.2.3/public/plugins/acme-app/panels/acme"
        );
    }

    #[test]
    fn constructor_rejects_bad_template() {
        let cdn = CdnUrls::new("not a url/{id}");
        assert!(cdn.constructor("x", "1").path("").is_err());
    }
}
