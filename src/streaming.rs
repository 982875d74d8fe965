//! Streaming downloader
//!
//! Pulls the media payload for one job into `<temp_dir>/<job_id>.part` in
//! fixed-size reads, reports coalesced progress, and finalizes the file by
//! moving it into the download directory under its sanitized name. A job is
//! only complete once that move has succeeded.

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::types::{DownloadInfo, FinalizedFile, JobId};
use futures::TryStreamExt;
use reqwest::StatusCode;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Tracks when the next progress report is due
#[derive(Debug)]
struct ProgressGate {
    total: Option<u64>,
    step: u8,
    last_reported: u8,
}

impl ProgressGate {
    fn new(total: Option<u64>, step: u8) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            step: step.max(1),
            last_reported: 0,
        }
    }

    /// Percent to report after `downloaded` bytes, if it advanced enough.
    /// Without a declared total nothing is ever reported.
    fn advance(&mut self, downloaded: u64) -> Option<u8> {
        let total = self.total?;
        let percent = ((downloaded.saturating_mul(100)) / total).min(100) as u8;
        if percent >= self.last_reported.saturating_add(self.step)
            || (percent == 100 && self.last_reported < 100)
        {
            self.last_reported = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Performs the byte transfer and finalization for a single job
#[derive(Clone, Debug)]
pub struct StreamingDownloader {
    http: reqwest::Client,
    download_dir: PathBuf,
    temp_dir: PathBuf,
    chunk_size: usize,
    progress_step: u8,
}

impl StreamingDownloader {
    /// Build a downloader from the download configuration.
    ///
    /// The media GET has no overall deadline and follows redirects.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_global_workers)
            .build()?;

        Ok(Self {
            http,
            download_dir: config.download_dir.clone(),
            temp_dir: config.temp_dir.clone(),
            chunk_size: config.chunk_size.max(1),
            progress_step: config.progress_step_percent,
        })
    }

    /// Temp file used for a job
    pub fn temp_path(&self, job_id: JobId) -> PathBuf {
        self.temp_dir.join(format!("{}.part", job_id))
    }

    /// Stream `info.location` to disk and move it into place as `filename`.
    ///
    /// `on_progress(percent, bytes)` is awaited whenever progress advanced
    /// by at least the configured step.
    pub async fn download<F, Fut>(
        &self,
        job_id: JobId,
        info: &DownloadInfo,
        filename: &str,
        on_progress: F,
    ) -> Result<FinalizedFile>
    where
        F: FnMut(u8, u64) -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let (temp_path, bytes) = self.stream_to_temp(job_id, info, on_progress).await?;
        let path = self.finalize(&temp_path, filename).await?;

        Ok(FinalizedFile {
            filename: filename.to_string(),
            path,
            bytes,
        })
    }

    /// Stream the payload into the job's temp file, returning its path and size.
    ///
    /// A failed read or write leaves the partial temp file behind.
    pub async fn stream_to_temp<F, Fut>(
        &self,
        job_id: JobId,
        info: &DownloadInfo,
        mut on_progress: F,
    ) -> Result<(PathBuf, u64)>
    where
        F: FnMut(u8, u64) -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let response = self.http.get(&info.location).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::MediaStatus {
                status: response.status().as_u16(),
            }
            .into());
        }

        let total = response.content_length().or(info.content_length);
        let temp_path = self.temp_path(job_id);
        let write_failed = |reason: String| DownloadError::WriteFailed {
            path: temp_path.clone(),
            reason,
        };

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| write_failed(format!("cannot create temp directory: {}", e)))?;
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed(format!("cannot create temp file: {}", e)))?;

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = std::pin::pin!(StreamReader::new(stream));
        let mut buf = vec![0u8; self.chunk_size];
        let mut gate = ProgressGate::new(total, self.progress_step);
        let mut downloaded: u64 = 0;

        tracing::debug!(job_id = %job_id, path = %temp_path.display(), total = ?total, "streaming to temp file");

        loop {
            let read = reader
                .read(&mut buf)
                .await
                .map_err(|e| write_failed(format!("read failed: {}", e)))?;
            if read == 0 {
                break;
            }

            let written = file
                .write(&buf[..read])
                .await
                .map_err(|e| write_failed(format!("write failed: {}", e)))?;
            if written < read {
                return Err(DownloadError::ShortWrite {
                    written,
                    expected: read,
                }
                .into());
            }

            downloaded += written as u64;
            if let Some(percent) = gate.advance(downloaded) {
                tracing::debug!(job_id = %job_id, percent, bytes = downloaded, "download progress");
                on_progress(percent, downloaded).await;
            }
        }

        file.flush()
            .await
            .map_err(|e| write_failed(format!("flush failed: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| write_failed(format!("sync failed: {}", e)))?;

        Ok((temp_path, downloaded))
    }

    /// Move a fully written temp file to `<download_dir>/<filename>`.
    ///
    /// An existing file at the destination is never replaced; the job fails
    /// with a move failure and the temp file is kept. Falls back to
    /// copy-then-delete when the rename crosses filesystems; failing to
    /// delete the temp copy afterwards is only logged.
    pub async fn finalize(&self, temp_path: &Path, filename: &str) -> Result<PathBuf> {
        let dest_path = self.download_dir.join(filename);
        let move_failed = |reason: String| DownloadError::MoveFailed {
            source_path: temp_path.to_path_buf(),
            dest_path: dest_path.clone(),
            reason,
        };

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| move_failed(format!("cannot create download directory: {}", e)))?;

        let exists = tokio::fs::try_exists(&dest_path)
            .await
            .map_err(|e| move_failed(format!("cannot inspect destination: {}", e)))?;
        if exists {
            tracing::warn!(path = %dest_path.display(), "destination already exists, not overwriting");
            return Err(move_failed("destination already exists".to_string()).into());
        }

        match tokio::fs::rename(temp_path, &dest_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                tokio::fs::copy(temp_path, &dest_path)
                    .await
                    .map_err(|e| move_failed(format!("copy failed: {}", e)))?;
                if let Err(e) = tokio::fs::remove_file(temp_path).await {
                    tracing::warn!(
                        path = %temp_path.display(),
                        error = %e,
                        "failed to remove temp file after copy"
                    );
                }
            }
            Err(e) => return Err(move_failed(e.to_string()).into()),
        }

        Ok(dest_path)
    }
}
