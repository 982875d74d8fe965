//! Application state for the API server

use crate::CatalogDownloader;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone). Configuration is read through
/// the downloader so handlers always see the running values.
#[derive(Clone)]
pub struct AppState {
    /// The downloader instance
    pub downloader: Arc<CatalogDownloader>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<CatalogDownloader>) -> Self {
        Self { downloader }
    }
}
