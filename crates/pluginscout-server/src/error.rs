//! Unified error handling for the API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use pluginscout_core::flags::FlagError;
use pluginscout_core::RegistryError;

/// API error response body
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg),
        };

        (
            status,
            Json(ApiError {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        if err.is_not_found() {
            return AppError::NotFound(err.to_string());
        }
        tracing::error!("Plugin registry error: {}", err);
        AppError::Internal(err.to_string())
    }
}

impl From<FlagError> for AppError {
    fn from(err: FlagError) -> Self {
        match err {
            FlagError::NotFound { .. } => AppError::NotFound(err.to_string()),
            FlagError::Request(_) | FlagError::Remote { .. } | FlagError::Decode(_) => {
                tracing::warn!("Flag provider error: {}", err);
                AppError::BadGateway(err.to_string())
            }
            FlagError::MissingUrl { .. }
            | FlagError::InvalidUrl { .. }
            | FlagError::NotBoolean { .. } => {
                tracing::error!("Flag evaluation error: {}", err);
                AppError::Internal(err.to_string())
            }
        }
    }
}
