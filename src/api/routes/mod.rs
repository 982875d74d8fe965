//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Batch submission
//! - [`status`] - Job status queries
//! - [`config`] - Runtime configuration
//! - [`system`] - Health, events, OpenAPI

use crate::types::{Job, JobMetadata, JobStatus};
use serde::{Deserialize, Serialize};

mod config;
mod downloads;
mod status;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use config::*;
pub use downloads::*;
pub use status::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Body of POST /download
///
/// Items are kept as raw JSON so that one malformed track is reported on its
/// own instead of rejecting the whole batch at deserialization time.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitDownloadRequest {
    /// Tracks to download: `{"url", "id", "title", "artists"}`
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub tracks: Vec<serde_json::Value>,
}

/// Response of POST /download when at least one track was admitted
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitDownloadResponse {
    /// Always "Download(s) initiated"
    pub message: String,
    /// One message per rejected item, omitted when every item was admitted
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// One entry of GET /status
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct JobStatusView {
    /// The validated catalog URL
    pub track_url: String,
    /// Current status
    pub status: JobStatus,
    /// Track metadata plus completion or failure details
    pub metadata: JobMetadata,
}

impl From<Job> for JobStatusView {
    fn from(job: Job) -> Self {
        Self {
            track_url: job.track_url,
            status: job.status,
            metadata: job.metadata,
        }
    }
}
