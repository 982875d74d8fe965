//! Catalog service integration
//!
//! - [`auth`]: the shared auth session (token pair, invalidation, refresh)
//! - [`client`]: authenticated requests against the catalog API
//! - [`link`]: validation and parsing of public catalog URLs

pub mod auth;
pub mod client;
pub mod link;

pub use auth::{AuthSession, TokenPair};
pub use client::CatalogClient;
pub use link::{LinkKind, TrackLink, validate_track_url};

use crate::error::Result;
use crate::types::{DownloadInfo, Store};

/// Resolves a catalog track id to a fetchable media location.
///
/// Abstracted so the download pipeline can be exercised without a live
/// catalog.
#[async_trait::async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolve `track_id` at the given quality tier.
    ///
    /// An empty location is an error, never a successful empty result.
    async fn resolve(&self, store: Store, track_id: &str, quality: &str) -> Result<DownloadInfo>;
}
