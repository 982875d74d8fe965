//! Shared test helpers for creating CatalogDownloader instances in tests.

use crate::catalog::TrackResolver;
use crate::config::Config;
use crate::downloader::CatalogDownloader;
use crate::error::{Error, Result};
use crate::types::{DownloadInfo, Job, JobId, Store};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolver that points every track at `location`.
///
/// Track id `"panic"` panics and `"status-<code>"` fails with that upstream
/// status, so failure paths can be driven per job.
pub(crate) struct FakeResolver {
    pub(crate) location: String,
}

#[async_trait::async_trait]
impl TrackResolver for FakeResolver {
    async fn resolve(&self, _store: Store, track_id: &str, _quality: &str) -> Result<DownloadInfo> {
        if track_id == "panic" {
            panic!("resolver exploded");
        }
        if let Some(code) = track_id.strip_prefix("status-") {
            let code: u16 = code.parse().unwrap();
            return Err(Error::Upstream {
                code,
                message: format!("request failed with status code: {}", code),
            });
        }
        Ok(DownloadInfo {
            location: self.location.clone(),
            content_length: None,
        })
    }
}

/// Config with every directory inside `root`
pub(crate) fn test_config(root: &std::path::Path, max_concurrent: usize) -> Config {
    let mut config = Config::default();
    config.download.download_dir = root.join("downloads");
    config.download.temp_dir = root.join("temp");
    config.download.max_concurrent_downloads = max_concurrent;
    config
}

/// Create a downloader whose tracks all resolve to `media_url`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    media_url: &str,
    max_concurrent: usize,
) -> (CatalogDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path(), max_concurrent);
    let resolver = Arc::new(FakeResolver {
        location: media_url.to_string(),
    });
    let downloader =
        CatalogDownloader::with_resolver(config, temp_dir.path().join("config.json"), resolver)
            .unwrap();
    (downloader, temp_dir)
}

/// A valid batch item
pub(crate) fn track(id: &str, title: &str, artists: &str) -> serde_json::Value {
    serde_json::json!({
        "url": format!("https://www.beatport.com/track/song/{}", id),
        "id": id,
        "title": title,
        "artists": artists,
    })
}

/// Poll until the job reaches a terminal state
pub(crate) async fn wait_for_terminal(downloader: &CatalogDownloader, id: JobId) -> Job {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let job = downloader.registry.get(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap()
}

/// Media host serving `body` at `/media.mp3`, optionally slowed down
pub(crate) async fn media_server(body: &[u8], delay: Option<Duration>) -> (MockServer, String) {
    let server = MockServer::start().await;
    let mut response = ResponseTemplate::new(200).set_body_bytes(body.to_vec());
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path("/media.mp3"))
        .respond_with(response)
        .mount(&server)
        .await;
    let url = format!("{}/media.mp3", server.uri());
    (server, url)
}
