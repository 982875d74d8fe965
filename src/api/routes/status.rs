//! Job status handlers.

use super::JobStatusView;
use crate::api::AppState;
use crate::error::{ApiError, Error};
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;

/// GET /status - All jobs keyed by id
#[utoipa::path(
    get,
    path = "/status",
    tag = "status",
    responses(
        (status = 200, description = "Every job known to this process, keyed by job id", body = inline(Object))
    )
)]
pub async fn list_status(State(state): State<AppState>) -> impl IntoResponse {
    let jobs: BTreeMap<String, JobStatusView> = state
        .downloader
        .registry
        .snapshot()
        .await
        .into_iter()
        .map(|(id, job)| (id.to_string(), job.into()))
        .collect();

    Json(jobs)
}

/// GET /status/:id - Single job
#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "status",
    params(
        ("id" = String, Path, description = "Job id (UUID)")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusView),
        (status = 404, description = "Unknown job id", body = ApiError)
    )
)]
pub async fn get_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    // an id that does not parse cannot name a job
    let Ok(job_id) = id.parse::<JobId>() else {
        return Error::NotFound(format!("job {}", id)).into_response();
    };

    match state.downloader.registry.get(job_id).await {
        Ok(job) => Json(JobStatusView::from(job)).into_response(),
        Err(e) => e.into_response(),
    }
}
