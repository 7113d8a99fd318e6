//! Plugin catalog and discovery endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use pluginscout_core::registry::CatalogPlugin;
use pluginscout_core::{CdnSource, FoundBundle, FoundPlugin};

use crate::error::AppError;
use crate::AppState;

/// Build the plugins router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plugins))
        .route("/managed", get(managed_plugins))
        .route("/discover", post(discover))
        .route("/:id", get(find_plugin))
}

#[derive(Serialize)]
pub struct ManagedResponse {
    pub plugins: Vec<String>,
}

/// Ad-hoc discovery request
#[derive(Deserialize)]
pub struct DiscoverRequest {
    pub urls: Vec<String>,
    /// Falls back to the configured setting
    #[serde(default)]
    pub concurrent: Option<bool>,
}

async fn list_plugins(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogPlugin>>, AppError> {
    Ok(Json(state.registry.available_plugins().await?))
}

async fn managed_plugins(State(state): State<AppState>) -> Json<ManagedResponse> {
    Json(ManagedResponse {
        plugins: state.managed.managed_plugins().await,
    })
}

/// Look up a catalog plugin on the CDN
async fn find_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FoundPlugin>, AppError> {
    // Cancel outstanding fetches if the client goes away
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let plugin = state.registry.find_plugin(&id, &cancel).await?;
    Ok(Json(plugin))
}

/// Discover bundles at arbitrary base URLs
async fn discover(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> Result<Json<Vec<FoundBundle>>, AppError> {
    if req.urls.is_empty() {
        return Err(AppError::BadRequest("urls must not be empty".to_string()));
    }

    let concurrent = req
        .concurrent
        .unwrap_or(state.finder.settings().concurrent);
    let finder = state.finder.clone().with_concurrency(concurrent);
    let source = CdnSource::new(req.urls);

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let bundles = finder.find(&source, &cancel).await;
    tracing::info!(
        "Discovered {} bundles (concurrent={})",
        bundles.len(),
        concurrent
    );
    Ok(Json(bundles))
}
