//! Batch admission: validate items, register jobs, dispatch workers.

use super::CatalogDownloader;
use crate::catalog::{TrackLink, validate_track_url};
use crate::error::{Error, Result};
use crate::types::{BatchOutcome, Event, JobId, JobMetadata, TrackRequest};
use crate::utils::escape_html;
use serde_json::Value;
use std::sync::atomic::Ordering;

/// Message returned for an empty batch
pub const NO_TRACKS_MESSAGE: &str = "No tracks provided";

/// Validate one raw batch item.
///
/// Checks run in order: `url` is a string, the URL has the right shape,
/// then `id`, `title` and `artists` are strings. The first failure wins.
pub(crate) fn validate_item(
    item: &Value,
    public_host: &str,
) -> std::result::Result<(TrackRequest, TrackLink), String> {
    let url = item
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| "Track: missing or invalid 'url'".to_string())?;

    let link = validate_track_url(url, public_host)?;

    let id = item
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| "Track: missing or invalid 'id'".to_string())?;
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Track with id '{}': missing or invalid 'title'", id))?;
    let artists = item
        .get("artists")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Track with id '{}': missing or invalid 'artists'", id))?;

    Ok((
        TrackRequest {
            url: url.to_string(),
            id: id.to_string(),
            title: title.to_string(),
            artists: artists.to_string(),
        },
        link,
    ))
}

impl CatalogDownloader {
    /// Admit a batch of raw track items.
    ///
    /// Every valid item becomes a `Pending` job and gets its own worker,
    /// which waits for an admission slot. Invalid items contribute one
    /// message each to [`BatchOutcome::errors`] and never reach the registry.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has started
    /// - [`Error::Validation`] when the batch is empty or nothing was admitted
    pub async fn submit_batch(&self, tracks: Vec<Value>) -> Result<BatchOutcome> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        if tracks.is_empty() {
            return Err(Error::Validation(vec![NO_TRACKS_MESSAGE.to_string()]));
        }

        let public_host = self.config.read().await.catalog.public_host.clone();
        let mut valid = Vec::with_capacity(tracks.len());
        let mut errors = Vec::new();

        for item in &tracks {
            match validate_item(item, &public_host) {
                Ok(parsed) => valid.push(parsed),
                Err(message) => {
                    tracing::warn!(error = %message, "rejected batch item");
                    errors.push(message);
                }
            }
        }

        if valid.is_empty() {
            return Err(Error::Validation(errors));
        }

        let mut admitted = Vec::with_capacity(valid.len());
        for (request, link) in valid {
            let id = JobId::new();
            let metadata = JobMetadata {
                track_id: escape_html(&request.id),
                title: escape_html(&request.title),
                artists: escape_html(&request.artists),
                ..Default::default()
            };

            self.registry
                .create(id, request.url.clone(), metadata)
                .await?;
            tracing::info!(job_id = %id, track_id = %request.id, url = %request.url, "job admitted");
            self.emit_event(Event::JobQueued {
                id,
                track_url: request.url.clone(),
            });

            self.dispatch(id, request, link);
            admitted.push(id);
        }

        Ok(BatchOutcome { admitted, errors })
    }
}
