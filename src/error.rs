//! Error types for catalog-dl
//!
//! This module provides the error taxonomy for the service:
//! - Request validation and configuration errors (surfaced as HTTP 400)
//! - Catalog authentication and upstream (transport) errors
//! - Download pipeline errors, keeping mid-stream write failures distinct from
//!   finalization (move) failures
//! - HTTP status code mapping and structured JSON error bodies for the API

use crate::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for catalog-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// One or more submitted items failed validation
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The catalog rejected our credentials even after a token refresh
    #[error("authentication failed (status {status}): {message}")]
    Auth {
        /// Upstream status code that triggered the failure
        status: u16,
        /// Description of the failure
        message: String,
    },

    /// The catalog answered with a status other than 200/302
    #[error("code: {code}, message: {message}")]
    Upstream {
        /// Upstream HTTP status code
        code: u16,
        /// Message built from the status and response body
        message: String,
    },

    /// Connection, timeout or protocol failure talking to a remote host
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Download pipeline error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Job registry error
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while resolving, streaming or finalizing a single job
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The link points at something other than a single track
    #[error("unsupported link type: {kind}")]
    UnsupportedLink {
        /// The link kind (e.g., "release")
        kind: String,
    },

    /// The catalog resolved the track to an empty media location
    #[error("empty download location for track {track_id}")]
    EmptyLocation {
        /// The catalog track id
        track_id: String,
    },

    /// The media host answered the streaming GET with a non-200 status
    #[error("download failed with status code: {status}")]
    MediaStatus {
        /// HTTP status returned by the media host
        status: u16,
    },

    /// The sanitized output filename is unusable
    #[error("invalid filename generated: '{name}': {reason}")]
    InvalidFilename {
        /// The sanitized name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Fewer bytes were written to the temp file than were read
    #[error("short write: wrote {written}, expected {expected}")]
    ShortWrite {
        /// Bytes actually written
        written: usize,
        /// Bytes read from the stream
        expected: usize,
    },

    /// Reading the stream or writing the temp file failed mid-transfer
    #[error("error writing to {path}: {reason}")]
    WriteFailed {
        /// The temporary file being written
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// The fully-downloaded temp file could not be moved to its destination
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The temporary file
        source_path: PathBuf,
        /// The destination path
        dest_path: PathBuf,
        /// The underlying failure
        reason: String,
    },
}

/// Job registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No job with this id exists
    #[error("job {id} not found")]
    NotFound {
        /// The missing job id
        id: JobId,
    },

    /// The job already reached a terminal state and cannot change
    #[error("job {id} is already {status}")]
    TerminalState {
        /// The job id
        id: JobId,
        /// Its terminal status
        status: JobStatus,
    },

    /// The requested transition would move the job backwards
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The job id
        id: JobId,
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },
}

impl Error {
    /// Numeric code recorded as `errorCode` on a failed job.
    ///
    /// Upstream status codes are preserved when the failure originated at a
    /// remote host; everything else falls back to the mapped HTTP status.
    pub fn job_error_code(&self) -> u16 {
        match self {
            Error::Auth { status, .. } => *status,
            Error::Upstream { code, .. } => *code,
            Error::Network(e) => e.status().map(|s| s.as_u16()).unwrap_or(502),
            Error::Download(DownloadError::MediaStatus { status }) => *status,
            other => other.status_code(),
        }
    }
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "job 5f0c… not found",
///     "details": { "job_id": "5f0c…" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 401 Unauthorized
            Error::Auth { .. } => 401,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Registry(RegistryError::NotFound { .. }) => 404,

            // 409 Conflict
            Error::Registry(RegistryError::TerminalState { .. }) => 409,
            Error::Registry(RegistryError::InvalidTransition { .. }) => 409,

            // 422 Unprocessable Entity
            Error::Download(DownloadError::UnsupportedLink { .. }) => 422,
            Error::Download(DownloadError::InvalidFilename { .. }) => 422,

            // 502 Bad Gateway - remote side misbehaved
            Error::Upstream { .. } => 502,
            Error::Network(_) => 502,
            Error::Download(DownloadError::EmptyLocation { .. }) => 502,
            Error::Download(DownloadError::MediaStatus { .. }) => 502,

            // 500 Internal Server Error
            Error::Download(DownloadError::ShortWrite { .. }) => 500,
            Error::Download(DownloadError::WriteFailed { .. }) => 500,
            Error::Download(DownloadError::MoveFailed { .. }) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Auth { .. } => "auth_error",
            Error::Upstream { .. } => "upstream_error",
            Error::Network(_) => "network_error",
            Error::Download(e) => match e {
                DownloadError::UnsupportedLink { .. } => "unsupported_link",
                DownloadError::EmptyLocation { .. } => "empty_location",
                DownloadError::MediaStatus { .. } => "media_status",
                DownloadError::InvalidFilename { .. } => "invalid_filename",
                DownloadError::ShortWrite { .. } => "short_write",
                DownloadError::WriteFailed { .. } => "write_failed",
                DownloadError::MoveFailed { .. } => "move_failed",
            },
            Error::Registry(e) => match e {
                RegistryError::NotFound { .. } => "job_not_found",
                RegistryError::TerminalState { .. } => "terminal_state",
                RegistryError::InvalidTransition { .. } => "invalid_transition",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Validation(errors) => Some(serde_json::json!({
                "errors": errors,
            })),
            Error::Auth { status, .. } => Some(serde_json::json!({
                "upstream_status": status,
            })),
            Error::Upstream { code, .. } => Some(serde_json::json!({
                "upstream_status": code,
            })),
            Error::Registry(RegistryError::NotFound { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Registry(RegistryError::TerminalState { id, status }) => {
                Some(serde_json::json!({
                    "job_id": id,
                    "status": status,
                }))
            }
            Error::Download(DownloadError::MoveFailed {
                source_path,
                dest_path,
                ..
            }) => Some(serde_json::json!({
                "source_path": source_path,
                "dest_path": dest_path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
