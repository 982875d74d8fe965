//! Core types for catalog-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a job, generated at admission time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random job id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
///
/// Transitions only move forward: `Pending -> Downloading -> {Completed | Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted, waiting for a download slot
    Pending,
    /// A worker holds a slot and is transferring bytes
    Downloading,
    /// The file was finalized under its destination name
    Completed,
    /// The job failed after admission
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job currently in `self` may move to `next`.
    ///
    /// Re-entering `Downloading` is allowed so progress can be recorded.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Completed | JobStatus::Failed, _) => false,
            (JobStatus::Pending, JobStatus::Pending) => true,
            (JobStatus::Pending, JobStatus::Downloading | JobStatus::Failed) => true,
            (JobStatus::Pending, JobStatus::Completed) => false,
            (JobStatus::Downloading, JobStatus::Pending) => false,
            (JobStatus::Downloading, _) => true,
        }
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata carried by a job record
///
/// Free-text fields are HTML-escaped before they are stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Catalog track id
    pub track_id: String,
    /// Track title
    pub title: String,
    /// Display string of the track artists
    pub artists: String,
    /// Final filename (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Final path (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Last reported progress in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Bytes transferred at the last progress report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_downloaded: Option<u64>,
    /// Numeric error code (set on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    /// Human-readable error (set on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Partial update applied to a job's metadata together with a status change
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    /// New filename
    pub filename: Option<String>,
    /// New path
    pub path: Option<String>,
    /// New progress percentage
    pub progress: Option<u8>,
    /// New byte count
    pub bytes_downloaded: Option<u64>,
    /// Error code
    pub error_code: Option<u16>,
    /// Error message
    pub error_message: Option<String>,
}

impl MetadataPatch {
    /// No metadata changes
    pub fn none() -> Self {
        Self::default()
    }

    /// Progress report
    pub fn progress(percent: u8, bytes_downloaded: u64) -> Self {
        Self {
            progress: Some(percent),
            bytes_downloaded: Some(bytes_downloaded),
            ..Self::default()
        }
    }

    /// Successful finalization
    pub fn completed(filename: impl Into<String>, path: &std::path::Path) -> Self {
        Self {
            filename: Some(filename.into()),
            path: Some(path.display().to_string()),
            progress: Some(100),
            ..Self::default()
        }
    }

    /// Failure details
    pub fn failed(error_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code),
            error_message: Some(error_message.into()),
            ..Self::default()
        }
    }

    /// Merge the patch into `metadata`, leaving absent fields untouched
    pub fn apply(self, metadata: &mut JobMetadata) {
        if let Some(filename) = self.filename {
            metadata.filename = Some(filename);
        }
        if let Some(path) = self.path {
            metadata.path = Some(path);
        }
        if let Some(progress) = self.progress {
            metadata.progress = Some(progress);
        }
        if let Some(bytes) = self.bytes_downloaded {
            metadata.bytes_downloaded = Some(bytes);
        }
        if let Some(code) = self.error_code {
            metadata.error_code = Some(code);
        }
        if let Some(message) = self.error_message {
            metadata.error_message = Some(message);
        }
    }
}

/// One tracked download request and its lifecycle state
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job id
    pub id: JobId,
    /// The validated catalog URL
    pub track_url: String,
    /// Current status
    pub status: JobStatus,
    /// Track metadata, completion and failure details
    pub metadata: JobMetadata,
    /// When the job was admitted
    pub created_at: DateTime<Utc>,
    /// When the job record last changed
    pub updated_at: DateTime<Utc>,
}

/// A batch item that passed validation, carried strongly typed to the worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackRequest {
    /// Catalog URL of the track
    pub url: String,
    /// Catalog track id
    pub id: String,
    /// Track title
    pub title: String,
    /// Display string of the track artists
    pub artists: String,
}

/// Catalog backend; both share one protocol
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Beatport
    #[default]
    Beatport,
    /// Beatsource
    Beatsource,
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Beatport => f.write_str("beatport"),
            Store::Beatsource => f.write_str("beatsource"),
        }
    }
}

/// Result of resolving a track to a fetchable location (never persisted)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// URL of the media payload
    #[serde(default)]
    pub location: String,
    /// Payload size if the catalog reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// Result of admitting one batch
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    /// Jobs created, in submission order
    pub admitted: Vec<JobId>,
    /// One message per rejected item
    pub errors: Vec<String>,
}

/// Where a finalized file ended up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedFile {
    /// Sanitized filename
    pub filename: String,
    /// Full destination path
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Events emitted as jobs move through their lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job was admitted
    JobQueued {
        /// Job id
        id: JobId,
        /// Track URL
        track_url: String,
    },
    /// A worker acquired a slot and started the job
    JobStarted {
        /// Job id
        id: JobId,
    },
    /// Coalesced progress report
    JobProgress {
        /// Job id
        id: JobId,
        /// Percent complete
        percent: u8,
        /// Bytes transferred so far
        bytes_downloaded: u64,
    },
    /// The job's file was finalized
    JobCompleted {
        /// Job id
        id: JobId,
        /// Final filename
        filename: String,
        /// Final path
        path: PathBuf,
    },
    /// The job failed
    JobFailed {
        /// Job id
        id: JobId,
        /// Numeric error code
        code: u16,
        /// Error message
        error: String,
    },
    /// The admission gate was resized
    ConcurrencyChanged {
        /// New limit
        max_concurrent_downloads: usize,
    },
    /// The service is shutting down
    Shutdown,
}
