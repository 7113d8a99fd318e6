//! OFREP flag evaluation endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use pluginscout_core::config::FlagProviderKind;
use pluginscout_core::flags::FlagEvaluation;

use crate::error::AppError;
use crate::AppState;

/// Build the flags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/evaluate/flags", post(eval_all_flags))
        .route("/evaluate/flags/:flag_key", post(eval_flag))
}

/// Evaluate every flag.
///
/// The remote provider gets the request body as-is and its answer is
/// relayed with the upstream status.
async fn eval_all_flags(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    match state.flags.provider_kind() {
        FlagProviderKind::Static => Ok(Json(state.flags.eval_all_flags().await?).into_response()),
        FlagProviderKind::Goff => {
            let (status, body) = state.flags.forward_bulk(body).await?;
            Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
    }
}

async fn eval_flag(
    State(state): State<AppState>,
    Path(flag_key): Path<String>,
) -> Result<Json<FlagEvaluation>, AppError> {
    Ok(Json(state.flags.eval_flag(&flag_key).await?))
}
