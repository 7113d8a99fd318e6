//! pluginscout server
//!
//! HTTP API over the plugin catalog, CDN discovery, discovery metrics and
//! OFREP feature flag evaluation.
//! The binary lives in the CLI crate; start the server with `start_server()`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use pluginscout_core::flags::FlagService;
use pluginscout_core::registry::{ManagedPlugins, RegistryManagedPlugins};
use pluginscout_core::{CatalogService, CdnFinder, CdnUrls, Config, FindMetrics, PluginRegistry};

pub mod error;
pub mod routes;

/// Configuration for starting the server.
pub struct ServerConfig {
    /// Port to listen on (default: 3000).
    pub port: u16,
    pub config: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            config: Config::default(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn PluginRegistry>,
    pub managed: Arc<dyn ManagedPlugins>,
    /// Finder used for ad-hoc discovery requests
    pub finder: CdnFinder,
    pub flags: Arc<FlagService>,
    pub metrics: Arc<FindMetrics>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn PluginRegistry>,
        finder: CdnFinder,
        flags: FlagService,
        metrics: Arc<FindMetrics>,
    ) -> Self {
        let managed = Arc::new(RegistryManagedPlugins::new(registry.clone()));
        Self {
            registry,
            managed,
            finder: finder.with_metrics(metrics.clone()),
            flags: Arc::new(flags),
            metrics,
        }
    }

    /// Wire the catalog, finder and flag service from configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let metrics = FindMetrics::global();
        let finder = CdnFinder::new(
            config.finder_settings(),
            CdnUrls::new(config.cdn.url_template.clone()),
        )
        .context("Failed to build HTTP client")?
        .with_metrics(metrics.clone());

        let catalog = CatalogService::load(&config.catalog.path, finder.clone())
            .await
            .context("Failed to load plugin catalog")?;
        tracing::info!(
            "Loaded {} catalog plugins from {}",
            catalog.len(),
            config.catalog.path.display()
        );

        let client = reqwest::Client::builder()
            .timeout(finder.settings().request_timeout)
            .build()
            .context("Failed to build flag provider client")?;
        let flags = FlagService::from_config(&config.openfeature, &config.feature_toggles, client)
            .context("Failed to configure feature flags")?;

        Ok(Self::new(Arc::new(catalog), finder, flags, metrics))
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", routes::api_router())
        .nest("/ofrep/v1", routes::ofrep_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server and block until shutdown.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::from_config(&config.config).await?;
    let app = build_router(state);

    tracing::info!("pluginscout server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        concurrent_discovery: state.finder.settings().concurrent,
        flag_provider: state.flags.provider_kind().as_str().to_string(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    concurrent_discovery: bool,
    flag_provider: String,
}
