//! # catalog-dl
//!
//! Download orchestration service for remote music catalog tracks.
//!
//! Batches of catalog track URLs are validated, admitted as jobs and
//! downloaded in the background under a configurable concurrency limit. Each
//! job resolves its track through the authenticated catalog API, streams the
//! media payload to a temporary file and finalizes it under a sanitized
//! `Artists - Title.mp3` name. Job status, configuration and events are
//! exposed over a small REST API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_dl::{CatalogDownloader, Config};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_init(Path::new("config.json"))?;
//!     let downloader = CatalogDownloader::new(config, "config.json")?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = downloader
//!         .submit_batch(vec![serde_json::json!({
//!             "url": "https://www.beatport.com/track/song/1",
//!             "id": "1",
//!             "title": "Song",
//!             "artists": "Band",
//!         })])
//!         .await?;
//!     println!("admitted {} job(s)", outcome.admitted.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Catalog API client, authentication session and link validation
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// In-memory job registry
pub mod registry;
/// Streaming download and file finalization
pub mod streaming;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use catalog::{AuthSession, CatalogClient, TokenPair, TrackResolver};
pub use config::{Config, ConfigUpdate};
pub use downloader::CatalogDownloader;
pub use error::{ApiError, DownloadError, Error, ErrorDetail, RegistryError, Result, ToHttpStatus};
pub use registry::JobRegistry;
pub use types::{
    BatchOutcome, DownloadInfo, Event, Job, JobId, JobMetadata, JobStatus, Store, TrackRequest,
};

/// Serve the API until a termination signal arrives, then shut down.
///
/// The API stops accepting connections first; the downloader then stops
/// admitting batches and waits for running jobs (see
/// [`CatalogDownloader::shutdown`]).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use catalog_dl::{CatalogDownloader, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Arc::new(CatalogDownloader::new(Config::default(), "config.json")?);
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: std::sync::Arc<CatalogDownloader>) -> Result<()> {
    let config = std::sync::Arc::new(downloader.get_config().await);
    api::start_api_server(downloader.clone(), config, wait_for_signal()).await?;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
