//! Shared fixtures for integration tests: a mock catalog plus media host and
//! a router built from the public API.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use catalog_dl::api::create_router;
use catalog_dl::{CatalogDownloader, Config, JobStatus};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "access-1";

/// Everything one scenario needs; keep it alive for the whole test
pub struct Harness {
    pub app: Router,
    pub downloader: Arc<CatalogDownloader>,
    pub catalog: MockServer,
    pub temp_dir: TempDir,
}

/// Build a harness whose catalog lives on a wiremock server
pub async fn harness(max_concurrent: usize) -> Harness {
    let catalog = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.temp_dir = temp_dir.path().join("temp");
    config.download.max_concurrent_downloads = max_concurrent;
    config.catalog.beatport_base_url = catalog.uri();
    config.catalog.beatsource_base_url = catalog.uri();
    config.catalog.client_id = Some("client".into());
    config.catalog.access_token = Some(ACCESS_TOKEN.into());
    config.catalog.refresh_token = Some("refresh-1".into());

    let downloader = Arc::new(
        CatalogDownloader::new(config.clone(), temp_dir.path().join("config.json")).unwrap(),
    );
    let app = create_router(downloader.clone(), Arc::new(config));

    Harness {
        app,
        downloader,
        catalog,
        temp_dir,
    }
}

/// Serve `body` for track `id`: the catalog resolves it to a media URL on
/// the same server, which answers after `delay`.
pub async fn serve_track(server: &MockServer, id: &str, body: &[u8], delay: Duration) {
    let media_path = format!("/media/{}.mp3", id);
    Mock::given(method("GET"))
        .and(path(format!("/catalog/tracks/{}/download/", id)))
        .and(query_param("quality", "lossless"))
        .and(header("Authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "location": format!("{}{}", server.uri(), media_path),
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

pub fn track(id: &str, title: &str, artists: &str) -> Value {
    serde_json::json!({
        "url": format!("https://www.beatport.com/track/song/{}", id),
        "id": id,
        "title": title,
        "artists": artists,
    })
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Poll GET /status until every job is terminal, returning the final body
/// and the highest number of jobs seen downloading at once.
pub async fn wait_until_settled(app: &Router, expected_jobs: usize) -> (Value, usize) {
    let downloading = JobStatus::Downloading.as_str();
    let mut max_downloading = 0;
    tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            let (_, body) = send(app, "GET", "/status", None).await;
            let jobs = body.as_object().unwrap();
            let running = jobs
                .values()
                .filter(|job| job["status"] == downloading)
                .count();
            max_downloading = max_downloading.max(running);

            let settled = jobs
                .values()
                .filter(|job| job["status"] == "completed" || job["status"] == "failed")
                .count();
            if jobs.len() == expected_jobs && settled == expected_jobs {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map(|body| (body, max_downloading))
    .expect("jobs did not settle in time")
}
