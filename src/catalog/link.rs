//! Public catalog URL validation and parsing

use crate::types::Store;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static LINK_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(track|release)/").expect("valid link regex"));

// /<kind>/<slug>/<id>
#[allow(clippy::expect_used)]
static LINK_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(track|release)/([^/]+)/([^/]+)").expect("valid link parts regex")
});

/// What a catalog link points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// A single track
    Track,
    /// A release (collection of tracks)
    Release,
}

impl LinkKind {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Track => "track",
            LinkKind::Release => "release",
        }
    }
}

/// A validated catalog link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackLink {
    /// Track or release
    pub kind: LinkKind,
    /// Backend the link belongs to
    pub store: Store,
    /// URL slug, if the path has one
    pub slug: Option<String>,
    /// Catalog id embedded in the path, if any
    pub id: Option<String>,
}

/// Check that `raw` is an `https` URL on `public_host` whose path starts with
/// `/track/` or `/release/`, and parse it.
///
/// Errors are the human-readable messages reported back for rejected batch
/// items.
pub fn validate_track_url(raw: &str, public_host: &str) -> Result<TrackLink, String> {
    let url = Url::parse(raw).map_err(|e| format!("Track: invalid URL format: {}", e))?;

    let host = url.host_str().unwrap_or_default();
    if url.scheme() != "https" || host != public_host || !LINK_PATH.is_match(url.path()) {
        return Err(format!(
            "Track: invalid catalog URL '{}' (host '{}'): scheme must be 'https', host must be '{}', and path must start with '/track/' or '/release/'",
            raw, host, public_host
        ));
    }

    let kind = if url.path().starts_with("/release/") {
        LinkKind::Release
    } else {
        LinkKind::Track
    };
    let store = if host.contains("beatsource") {
        Store::Beatsource
    } else {
        Store::Beatport
    };
    let (slug, id) = match LINK_PARTS.captures(url.path()) {
        Some(caps) => (
            caps.get(2).map(|m| m.as_str().to_string()),
            caps.get(3).map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    };

    Ok(TrackLink {
        kind,
        store,
        slug,
        id,
    })
}
