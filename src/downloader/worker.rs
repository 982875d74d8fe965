//! Per-job worker: wait for a slot, run the pipeline, record the outcome.

use super::CatalogDownloader;
use crate::catalog::{LinkKind, TrackLink};
use crate::error::{DownloadError, Error, Result};
use crate::types::{Event, FinalizedFile, JobId, JobStatus, MetadataPatch, TrackRequest};
use crate::utils::track_filename;

impl CatalogDownloader {
    /// Spawn the worker for an admitted job.
    ///
    /// The worker is tracked so shutdown can wait for it; the caller never
    /// blocks on slot acquisition.
    pub(crate) fn dispatch(&self, id: JobId, request: TrackRequest, link: TrackLink) {
        let downloader = self.clone();
        self.tasks.spawn(async move {
            downloader.run_job(id, request, link).await;
        });
    }

    /// Worker body. Errors never escape: they are written into the job.
    async fn run_job(&self, id: JobId, request: TrackRequest, link: TrackLink) {
        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.fail_job(id, &e).await;
                return;
            }
        };

        if let Err(e) = self
            .registry
            .update_status(id, JobStatus::Downloading, MetadataPatch::none())
            .await
        {
            tracing::warn!(job_id = %id, error = %e, "could not start job");
            return;
        }
        tracing::info!(job_id = %id, track_id = %request.id, "download started");
        self.emit_event(Event::JobStarted { id });

        // Run the pipeline in its own task so a panic is contained here
        let pipeline = {
            let downloader = self.clone();
            tokio::spawn(async move { downloader.run_pipeline(id, &request, &link).await })
        };

        match pipeline.await {
            Ok(Ok(file)) => self.complete_job(id, file).await,
            Ok(Err(e)) => self.fail_job(id, &e).await,
            Err(join_error) => {
                let e = Error::Other(format!("download task panicked: {}", join_error));
                self.fail_job(id, &e).await;
            }
        }

        // released only after the terminal status is visible
        drop(permit);
    }

    /// Resolve, stream and finalize one track
    async fn run_pipeline(
        &self,
        id: JobId,
        request: &TrackRequest,
        link: &TrackLink,
    ) -> Result<FinalizedFile> {
        if link.kind != LinkKind::Track {
            return Err(DownloadError::UnsupportedLink {
                kind: link.kind.as_str().to_string(),
            }
            .into());
        }

        let filename = track_filename(&request.artists, &request.title)?;
        let (store, quality) = {
            let config = self.config.read().await;
            (config.catalog.store, config.catalog.quality.clone())
        };

        let info = self.resolver.resolve(store, &request.id, &quality).await?;
        tracing::debug!(job_id = %id, location = %info.location, "track resolved");

        let registry = self.registry.clone();
        let event_tx = self.event_tx.clone();
        let on_progress = move |percent: u8, bytes_downloaded: u64| {
            let registry = registry.clone();
            let event_tx = event_tx.clone();
            async move {
                if let Err(e) = registry
                    .update_status(
                        id,
                        JobStatus::Downloading,
                        MetadataPatch::progress(percent, bytes_downloaded),
                    )
                    .await
                {
                    tracing::warn!(job_id = %id, error = %e, "progress update dropped");
                }
                event_tx
                    .send(Event::JobProgress {
                        id,
                        percent,
                        bytes_downloaded,
                    })
                    .ok();
            }
        };

        self.streamer
            .download(id, &info, &filename, on_progress)
            .await
    }

    async fn complete_job(&self, id: JobId, file: FinalizedFile) {
        let patch = MetadataPatch::completed(file.filename.clone(), &file.path);
        match self
            .registry
            .update_status(id, JobStatus::Completed, patch)
            .await
        {
            Ok(_) => {
                tracing::info!(
                    job_id = %id,
                    filename = %file.filename,
                    bytes = file.bytes,
                    "download completed"
                );
                self.emit_event(Event::JobCompleted {
                    id,
                    filename: file.filename,
                    path: file.path,
                });
            }
            Err(e) => tracing::warn!(job_id = %id, error = %e, "could not mark job completed"),
        }
    }

    async fn fail_job(&self, id: JobId, error: &Error) {
        let code = error.job_error_code();
        let message = error.to_string();
        tracing::error!(job_id = %id, code, error = %message, "download failed");

        match self
            .registry
            .update_status(id, JobStatus::Failed, MetadataPatch::failed(code, &message))
            .await
        {
            Ok(_) => self.emit_event(Event::JobFailed {
                id,
                code,
                error: message,
            }),
            Err(e) => tracing::warn!(job_id = %id, error = %e, "could not mark job failed"),
        }
    }
}
