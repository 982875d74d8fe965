//! Batch submission handler.

use super::{SubmitDownloadRequest, SubmitDownloadResponse};
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Message returned when a batch was accepted
pub const DOWNLOADS_INITIATED: &str = "Download(s) initiated";

/// POST /download - Submit a batch of tracks
///
/// Each item is validated on its own. Valid items become jobs and start
/// downloading in the background; invalid ones are reported in `errors`.
#[utoipa::path(
    post,
    path = "/download",
    tag = "downloads",
    request_body = SubmitDownloadRequest,
    responses(
        (status = 202, description = "At least one track was admitted", body = SubmitDownloadResponse),
        (status = 400, description = "No track was admitted", body = inline(Object)),
        (status = 405, description = "Method other than POST"),
        (status = 503, description = "Shutting down")
    )
)]
pub async fn submit_download(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SubmitDownloadRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejected malformed batch body");
            return Error::Validation(vec![format!("Invalid request body: {}", e)])
                .into_response();
        }
    };

    match state.downloader.submit_batch(request.tracks).await {
        Ok(outcome) => {
            if !outcome.errors.is_empty() {
                tracing::warn!(
                    admitted = outcome.admitted.len(),
                    rejected = outcome.errors.len(),
                    "batch partially admitted"
                );
            }
            (
                StatusCode::ACCEPTED,
                Json(SubmitDownloadResponse {
                    message: DOWNLOADS_INITIATED.to_string(),
                    errors: outcome.errors,
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
