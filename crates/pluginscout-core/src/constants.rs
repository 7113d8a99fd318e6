//! Shared constants

/// Application identity
pub mod app {
    pub const NAME: &str = "pluginscout";
    pub const CONFIG_DIR_NAME: &str = ".pluginscout";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
    /// Environment variable overriding the config file location
    pub const CONFIG_ENV: &str = "PLUGINSCOUT_CONFIG";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Discovery defaults
pub mod finder {
    use std::time::Duration;

    /// Upper bound on concurrent top-level manifest fetches
    pub const CONCURRENCY_LIMIT: usize = 32;
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MANIFEST_FILE: &str = "plugin.json";
    pub const USER_AGENT: &str = concat!("pluginscout/", env!("CARGO_PKG_VERSION"));
}

/// CDN layout
pub mod cdn {
    pub const DEFAULT_URL_TEMPLATE: &str = "http://plugins-cdn.grafana.net/{id}/{version}";
}

/// Catalog defaults
pub mod catalog {
    pub const DEFAULT_PATH: &str = "./plugins.json";
}

/// Metric names
pub mod metrics {
    pub const FIND_DURATION: &str = "pluginscout_plugin_find_duration_seconds";
    pub const FIND_DURATION_HELP: &str = "Plugin finding/discovery duration per class";
    /// Default Prometheus histogram buckets
    pub const DEFAULT_BUCKETS: [f64; 11] = [
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];
}
