//! In-memory job registry
//!
//! The registry is the single source of truth for job status. Every operation
//! takes the registry lock, so operations are atomic with respect to each
//! other, and readers always get owned copies that stay valid while workers
//! keep writing.

use crate::error::{RegistryError, Result};
use crate::types::{Job, JobId, JobMetadata, JobStatus, MetadataPatch};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrency-safe map of job id to job record
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `Pending` job.
    ///
    /// Ids are unique for the registry's lifetime; registering an id twice
    /// is rejected and leaves the existing record untouched.
    pub async fn create(&self, id: JobId, track_url: String, metadata: JobMetadata) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(&id) {
            return Err(RegistryError::InvalidTransition {
                id,
                from: existing.status,
                to: JobStatus::Pending,
            }
            .into());
        }

        let now = chrono::Utc::now();
        jobs.insert(
            id,
            Job {
                id,
                track_url,
                status: JobStatus::Pending,
                metadata,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Fetch a copy of one job
    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id }.into())
    }

    /// Move a job to `status` and merge `patch` into its metadata.
    ///
    /// Unknown ids report [`RegistryError::NotFound`]. Jobs in a terminal
    /// state are immutable, and transitions never move backwards.
    pub async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        patch: MetadataPatch,
    ) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(RegistryError::NotFound { id })?;

        if job.status.is_terminal() {
            return Err(RegistryError::TerminalState {
                id,
                status: job.status,
            }
            .into());
        }
        if !job.status.can_transition_to(status) {
            return Err(RegistryError::InvalidTransition {
                id,
                from: job.status,
                to: status,
            }
            .into());
        }

        job.status = status;
        patch.apply(&mut job.metadata);
        job.updated_at = chrono::Utc::now();
        Ok(job.clone())
    }

    /// Point-in-time copy of every job (order unspecified)
    pub async fn list(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Point-in-time copy keyed by job id, as served by the status endpoint
    pub async fn snapshot(&self) -> HashMap<JobId, Job> {
        self.jobs.read().await.clone()
    }

    /// Number of jobs currently in `status`
    pub async fn count_by_status(&self, status: JobStatus) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == status)
            .count()
    }

    /// Total number of jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the registry holds no jobs
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;

    fn metadata() -> JobMetadata {
        JobMetadata {
            track_id: "1".into(),
            title: "Song".into(),
            artists: "Band".into(),
            ..Default::default()
        }
    }

    async fn registry_with_job() -> (JobRegistry, JobId) {
        let registry = JobRegistry::new();
        let id = JobId::new();
        registry
            .create(id, "https://www.beatport.com/track/song/1".into(), metadata())
            .await
            .unwrap();
        (registry, id)
    }

    #[tokio::test]
    async fn create_registers_pending_job() {
        let (registry, id) = registry_with_job().await;

        let job = registry.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.metadata.title, "Song");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (registry, id) = registry_with_job().await;
        registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
            .unwrap();

        let err = registry
            .create(id, "https://other".into(), metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
        assert_eq!(
            registry.get(id).await.unwrap().status,
            JobStatus::Downloading
        );
    }

    #[tokio::test]
    async fn get_unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let err = registry.get(JobId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_unknown_job_is_not_found_without_panicking() {
        let registry = JobRegistry::new();
        let err = registry
            .update_status(JobId::new(), JobStatus::Failed, MetadataPatch::none())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::NotFound { .. })
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn terminal_state_is_immutable() {
        let (registry, id) = registry_with_job().await;
        registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
            .unwrap();
        registry
            .update_status(
                id,
                JobStatus::Completed,
                MetadataPatch::completed("Band - Song.mp3", std::path::Path::new("/d/x.mp3")),
            )
            .await
            .unwrap();

        let before = registry.get(id).await.unwrap();
        let err = registry
            .update_status(id, JobStatus::Failed, MetadataPatch::failed(500, "late"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::TerminalState { .. })
        ));

        let after = registry.get(id).await.unwrap();
        assert_eq!(after.status, JobStatus::Completed);
        assert_eq!(after.metadata, before.metadata);
        assert!(after.metadata.error_message.is_none());
    }

    #[tokio::test]
    async fn status_never_regresses() {
        let (registry, id) = registry_with_job().await;
        registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
            .unwrap();

        let err = registry
            .update_status(id, JobStatus::Pending, MetadataPatch::none())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn progress_updates_merge_metadata() {
        let (registry, id) = registry_with_job().await;
        registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
            .unwrap();
        let job = registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::progress(30, 3000))
            .await
            .unwrap();

        assert_eq!(job.metadata.progress, Some(30));
        assert_eq!(job.metadata.track_id, "1");
    }

    #[tokio::test]
    async fn snapshot_is_independent_of_later_writes() {
        let (registry, id) = registry_with_job().await;
        let snapshot = registry.snapshot().await;

        registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
            .unwrap();

        assert_eq!(snapshot[&id].status, JobStatus::Pending);
        assert!(serde_json::to_string(&snapshot).is_ok());
    }

    #[tokio::test]
    async fn concurrent_writers_each_own_their_entry() {
        let registry = Arc::new(JobRegistry::new());
        let mut ids = Vec::new();
        for _ in 0..50 {
            let id = JobId::new();
            registry
                .create(id, "https://www.beatport.com/track/x/1".into(), metadata())
                .await
                .unwrap();
            ids.push(id);
        }

        let mut handles = Vec::new();
        for id in ids.clone() {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .update_status(id, JobStatus::Downloading, MetadataPatch::none())
                    .await
                    .unwrap();
                registry
                    .update_status(id, JobStatus::Failed, MetadataPatch::failed(500, "boom"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.count_by_status(JobStatus::Failed).await, 50);
        assert_eq!(registry.list().await.len(), 50);
    }
}
