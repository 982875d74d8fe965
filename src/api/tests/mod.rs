use super::*;
use crate::downloader::test_helpers::{self, media_server, track, wait_for_terminal};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt; // for oneshot()


/// Router over a test downloader whose tracks resolve to `media_url`.
async fn test_app(
    media_url: &str,
    max_concurrent: usize,
) -> (Router, Arc<CatalogDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = test_helpers::create_test_downloader(media_url, max_concurrent);
    let downloader = Arc::new(downloader);
    let config = Arc::new(downloader.get_config().await);
    (create_router(downloader.clone(), config), downloader, temp_dir)
}

/// Router with a customized API config
async fn test_app_with(
    configure: impl FnOnce(&mut Config),
) -> (Router, Arc<CatalogDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        test_helpers::create_test_downloader("http://127.0.0.1:9/unused", 1);
    let downloader = Arc::new(downloader);
    let mut config = downloader.get_config().await;
    configure(&mut config);
    (
        create_router(downloader.clone(), Arc::new(config)),
        downloader,
        temp_dir,
    )
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn api_server_binds_and_stops_on_signal() {
    let (downloader, _temp_dir) =
        test_helpers::create_test_downloader("http://127.0.0.1:9/unused", 1);
    let mut config = downloader.get_config().await;
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(
        Arc::new(downloader),
        Arc::new(config),
        async move {
            rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let (app, _downloader, _temp_dir) = test_app_with(|c| {
        c.api.cors_enabled = true;
        c.api.cors_origins = vec!["*".to_string()];
    })
    .await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let (app, _downloader, _temp_dir) = test_app_with(|c| c.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn api_key_guards_every_route() {
    let (app, _downloader, _temp_dir) =
        test_app_with(|c| c.api.api_key = Some("s3cret".to_string())).await;

    let response = app.clone().oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/status")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn swagger_ui_is_optional() {
    let (app, _downloader, _temp_dir) = test_app_with(|c| c.api.swagger_ui = false).await;
    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (app, _downloader, _temp_dir) = test_app_with(|c| c.api.swagger_ui = true).await;
    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
