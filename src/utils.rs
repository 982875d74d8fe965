//! Utility functions for filenames and stored text

use crate::error::{DownloadError, Result};

/// Longest filename accepted, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

/// Extension given to every finalized track
pub const TRACK_EXTENSION: &str = "mp3";

/// Whether `c` may appear in an output filename
fn is_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            ' ' | '-' | '_' | '.' | ',' | '(' | ')' | '[' | ']' | '{' | '}'
        )
}

/// Strip every character outside the filename whitelist
/// (`A-Z a-z 0-9`, space, and `- _ . , ( ) [ ] { }`).
///
/// Idempotent: sanitizing an already-sanitized name returns it unchanged.
///
/// # Examples
///
/// ```
/// use catalog_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC - T.N.T.mp3"), "ACDC - T.N.T.mp3");
/// assert_eq!(sanitize_filename("Björk - Jóga.mp3"), "Bjrk - Jga.mp3");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| is_filename_char(*c)).collect()
}

/// Compose and sanitize the destination filename `"<artists> - <title>.mp3"`.
///
/// Fails rather than truncating: an empty result, a result longer than
/// [`MAX_FILENAME_LEN`], or one where neither artists nor title survive
/// sanitization is rejected.
///
/// # Examples
///
/// ```
/// use catalog_dl::utils::track_filename;
///
/// assert_eq!(track_filename("Band", "Song").unwrap(), "Band - Song.mp3");
/// assert!(track_filename("Band", &"x".repeat(300)).is_err());
/// ```
pub fn track_filename(artists: &str, title: &str) -> Result<String> {
    let raw = format!("{} - {}.{}", artists, title, TRACK_EXTENSION);
    let name = sanitize_filename(&raw);

    let reason = if name.is_empty() {
        Some("filename is empty after sanitization".to_string())
    } else if name.len() > MAX_FILENAME_LEN {
        Some(format!(
            "filename is {} bytes, limit is {}",
            name.len(),
            MAX_FILENAME_LEN
        ))
    } else if sanitize_filename(artists).trim().is_empty()
        && sanitize_filename(title).trim().is_empty()
    {
        Some("artists and title contain no usable characters".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DownloadError::InvalidFilename { name, reason }.into()),
        None => Ok(name),
    }
}

/// Escape `< > & ' "` so stored text renders inertly in HTML.
///
/// # Examples
///
/// ```
/// use catalog_dl::utils::escape_html;
///
/// assert_eq!(escape_html("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
/// ```
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&#34;"),
            other => escaped.push(other),
        }
    }
    escaped
}
