use super::*;
use crate::config::ConfigUpdate;

fn update(max_concurrent: Option<i64>, max_global: Option<i64>) -> ConfigUpdate {
    ConfigUpdate {
        max_concurrent_downloads: max_concurrent,
        max_global_workers: max_global,
        ..Default::default()
    }
}

#[tokio::test]
async fn update_persists_then_resizes() {
    let (downloader, temp_dir) = create_test_downloader("http://127.0.0.1:9/unused", 1);
    let mut events = downloader.subscribe();

    let config = downloader
        .update_config(update(Some(4), Some(8)))
        .await
        .unwrap();
    assert_eq!(config.download.max_concurrent_downloads, 4);
    assert_eq!(downloader.max_concurrent_downloads(), 4);
    assert_eq!(downloader.gate.available().await, 4);

    let persisted =
        crate::config::Config::load_or_init(&temp_dir.path().join("config.json")).unwrap();
    assert_eq!(persisted.download.max_concurrent_downloads, 4);
    assert_eq!(persisted.download.max_global_workers, 8);
    assert_eq!(
        downloader.get_config().await.download.max_concurrent_downloads,
        4
    );

    match events.recv().await.unwrap() {
        Event::ConcurrencyChanged {
            max_concurrent_downloads,
        } => assert_eq!(max_concurrent_downloads, 4),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn non_positive_limits_are_rejected_and_change_nothing() {
    let (downloader, temp_dir) = create_test_downloader("http://127.0.0.1:9/unused", 2);

    for bad in [Some(0), Some(-3), None] {
        let err = downloader.update_config(update(bad, None)).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{bad:?}");
    }

    assert_eq!(downloader.max_concurrent_downloads(), 2);
    assert!(!temp_dir.path().join("config.json").exists());
}

#[tokio::test]
async fn oversized_limit_is_rejected_before_anything_changes() {
    let (downloader, temp_dir) = create_test_downloader("http://127.0.0.1:9/unused", 3);

    let err = downloader
        .update_config(update(Some(i64::MAX), None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));

    assert_eq!(downloader.max_concurrent_downloads(), 3);
    assert_eq!(downloader.gate.available().await, 3);
    assert_eq!(
        downloader.get_config().await.download.max_concurrent_downloads,
        3
    );
    assert!(!temp_dir.path().join("config.json").exists());
}

#[tokio::test]
async fn persist_failure_leaves_running_limit_unchanged() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = super::super::test_helpers::test_config(temp_dir.path(), 2);
    // a directory where the config file should be
    let config_path = temp_dir.path().join("config.json");
    std::fs::create_dir_all(&config_path).unwrap();
    let resolver = std::sync::Arc::new(super::super::test_helpers::FakeResolver {
        location: "http://127.0.0.1:9/unused".into(),
    });
    let downloader = CatalogDownloader::with_resolver(config, &config_path, resolver).unwrap();

    let result = downloader.update_config(update(Some(5), None)).await;
    assert!(result.is_err());
    assert_eq!(downloader.max_concurrent_downloads(), 2);
    assert_eq!(
        downloader.get_config().await.download.max_concurrent_downloads,
        2
    );
}

#[tokio::test]
async fn raising_the_limit_releases_waiting_jobs() {
    let (_server, media_url) = media_server(b"payload", Some(Duration::from_millis(400))).await;
    let (downloader, _temp_dir) = create_test_downloader(&media_url, 1);

    let outcome = downloader
        .submit_batch(vec![track("1", "A", "Band"), track("2", "B", "Band")])
        .await
        .unwrap();

    // let the first job take the only slot
    tokio::time::sleep(Duration::from_millis(100)).await;
    downloader
        .update_config(update(Some(2), None))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        downloader
            .registry
            .count_by_status(JobStatus::Downloading)
            .await,
        2
    );

    for id in outcome.admitted {
        wait_for_terminal(&downloader, id).await;
    }
}
