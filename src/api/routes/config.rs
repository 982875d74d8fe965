//! Configuration handlers.

use crate::api::AppState;
use crate::config::ConfigUpdate;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /config - Get running config (credentials redacted)
#[utoipa::path(
    get,
    path = "/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration", body = crate::config::Config)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.get_config().await.redacted()))
}

/// PUT|POST /config - Update the concurrency limit
///
/// The body may be the flat update or the full document from `GET /config`.
/// The new value is persisted before it takes effect; a failed write leaves
/// the running limit unchanged.
#[utoipa::path(
    put,
    path = "/config",
    tag = "config",
    request_body(content = ConfigUpdate, description = "Runtime-changeable settings"),
    responses(
        (status = 200, description = "Configuration updated", body = inline(Object)),
        (status = 400, description = "Malformed body, or a missing or out-of-range limit"),
        (status = 500, description = "Configuration could not be persisted")
    )
)]
pub async fn update_config(State(state): State<AppState>, body: Bytes) -> Response {
    let update = match ConfigUpdate::from_json(&body) {
        Ok(update) => update,
        Err(e) => return e.into_response(),
    };

    match state.downloader.update_config(update).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "config updated"}))).into_response(),
        Err(e) => e.into_response(),
    }
}
