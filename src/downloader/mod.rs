//! Download orchestration split into focused submodules.
//!
//! The `CatalogDownloader` struct and its methods are organized by domain:
//! - [`admission`] - Counting gate bounding concurrent downloads
//! - [`orchestrator`] - Batch validation, job creation and dispatch
//! - [`worker`] - Per-job pipeline execution and terminal status
//! - [`config_ops`] - Runtime configuration updates
//! - [`lifecycle`] - Shutdown coordination

mod admission;
mod config_ops;
mod lifecycle;
mod orchestrator;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use admission::AdmissionGate;

use crate::catalog::{CatalogClient, TrackResolver};
use crate::config::Config;
use crate::error::Result;
use crate::registry::JobRegistry;
use crate::streaming::StreamingDownloader;
use crate::types::Event;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{RwLock, broadcast};
use tokio_util::task::TaskTracker;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CatalogDownloader {
    /// Job registry, the single source of truth for job status.
    /// Public so status queries and integration tests can read it directly.
    pub registry: Arc<JobRegistry>,
    /// Admission gate bounding simultaneously running downloads
    pub(crate) gate: Arc<AdmissionGate>,
    /// Resolves track ids to media locations
    pub(crate) resolver: Arc<dyn TrackResolver>,
    /// Byte transfer and finalization
    pub(crate) streamer: StreamingDownloader,
    /// Running configuration
    pub(crate) config: Arc<RwLock<Config>>,
    /// Where configuration updates are persisted
    pub(crate) config_path: Arc<PathBuf>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Tracks dispatched workers so shutdown can wait for them
    pub(crate) tasks: TaskTracker,
    /// Set to false during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl CatalogDownloader {
    /// Create a downloader backed by the catalog client described in `config`.
    ///
    /// `config_path` is where `update_config` persists changes.
    pub fn new(config: Config, config_path: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let client = CatalogClient::new(&config.catalog, config.download.max_global_workers)?;
        Self::with_resolver(config, config_path, Arc::new(client))
    }

    /// Create a downloader with a custom track resolver
    pub fn with_resolver(
        config: Config,
        config_path: impl Into<PathBuf>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Result<Self> {
        config.validate()?;
        let streamer = StreamingDownloader::new(&config.download)?;
        let gate = AdmissionGate::new(config.download.max_concurrent_downloads);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            max_concurrent_downloads = config.download.max_concurrent_downloads,
            store = %config.catalog.store,
            download_dir = %config.download.download_dir.display(),
            "downloader initialized"
        );

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            gate: Arc::new(gate),
            resolver,
            streamer,
            config: Arc::new(RwLock::new(config)),
            config_path: Arc::new(config_path.into()),
            event_tx,
            tasks: TaskTracker::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configured concurrency limit
    pub fn max_concurrent_downloads(&self) -> usize {
        self.gate.capacity()
    }

    /// Send an event to all subscribers; dropped silently when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
