//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::CatalogDownloader;

/// How long shutdown waits for running workers
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl CatalogDownloader {
    /// Whether new batches are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the downloader
    ///
    /// 1. Stops admitting batches (`submit_batch` returns `ShuttingDown`)
    /// 2. Closes the admission gate, so jobs still waiting for a slot fail
    /// 3. Waits up to 30 seconds for running workers to record their outcome
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.gate.close().await;
        self.tasks.close();
        tracing::info!(running = self.tasks.len(), "Stopped accepting new downloads");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.tasks.wait()).await {
            Ok(()) => tracing::info!("All workers finished"),
            Err(_) => tracing::warn!(
                running = self.tasks.len(),
                "Timeout waiting for workers, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
