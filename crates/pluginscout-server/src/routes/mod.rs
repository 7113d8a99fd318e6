//! API routes

use axum::Router;

use crate::AppState;

mod flags;
mod plugins;

/// Build the API router with all endpoints
pub fn api_router() -> Router<AppState> {
    Router::new().nest("/plugins", plugins::router())
}

/// OFREP flag evaluation endpoints, mounted under `/ofrep/v1`
pub fn ofrep_router() -> Router<AppState> {
    flags::router()
}
