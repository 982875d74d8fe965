//! Runtime configuration updates: concurrency limit and pool sizing.

use super::CatalogDownloader;
use crate::config::{Config, ConfigUpdate};
use crate::error::Result;
use crate::types::Event;

impl CatalogDownloader {
    /// Get a copy of the running configuration
    pub async fn get_config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Apply a runtime configuration update.
    ///
    /// The update is validated, persisted to the config file, and only then
    /// applied: the admission gate is resized and subscribers are notified.
    /// If persisting fails nothing changes. Jobs already downloading keep
    /// their slot.
    ///
    /// `max_global_workers` is stored but only sizes connection pools built
    /// after the next restart.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Config`] for a missing, non-positive or oversized limit
    /// - [`crate::Error::Io`] / [`crate::Error::Serialization`] when persisting fails
    pub async fn update_config(&self, update: ConfigUpdate) -> Result<Config> {
        let (max_concurrent, max_global) = update.validate()?;

        let mut config = self.config.write().await;
        let mut next = config.clone();
        next.download.max_concurrent_downloads = max_concurrent;
        if let Some(max_global) = max_global {
            next.download.max_global_workers = max_global;
        }

        next.validate()?;

        if let Err(e) = next.save_async(&self.config_path).await {
            tracing::error!(path = %self.config_path.display(), error = %e, "failed to persist configuration");
            return Err(e);
        }

        *config = next.clone();
        // resize while still holding the config lock so concurrent updates apply in order
        self.gate.resize(max_concurrent).await;
        drop(config);

        self.emit_event(Event::ConcurrencyChanged {
            max_concurrent_downloads: max_concurrent,
        });
        tracing::info!(
            max_concurrent_downloads = max_concurrent,
            max_global_workers = next.download.max_global_workers,
            "configuration updated"
        );

        Ok(next)
    }
}
