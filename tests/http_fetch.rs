// tests/http_fetch.rs
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use chrono::{TimeZone, Utc};
use feed_snapshot::ingest::fetch::Fetcher;
use feed_snapshot::ingest::providers::http::{HttpFeedSource, DEFAULT_USER_AGENT};
use feed_snapshot::{FeedConfig, FeedSource, FetchError, FileStore, Pipeline, SnapshotStore};

const GOOGLE_NEWS: &str = include_str!("fixtures/google_news.xml");

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/feed",
            get(|| async { ([(header::CONTENT_TYPE, "application/rss+xml")], GOOGLE_NEWS) }),
        )
        .route("/down", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                GOOGLE_NEWS
            }),
        )
        .route(
            "/ua",
            get(|headers: HeaderMap| async move {
                headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn source(timeout: Duration) -> HttpFeedSource {
    HttpFeedSource::new(timeout, DEFAULT_USER_AGENT).expect("client builds")
}

#[tokio::test]
async fn ok_response_body_is_returned() {
    let addr = spawn_server().await;
    let body = source(Duration::from_secs(5))
        .retrieve(&format!("http://{addr}/feed"))
        .await
        .unwrap();
    assert!(body.contains("<rss"));

    let ua = source(Duration::from_secs(5))
        .retrieve(&format!("http://{addr}/ua"))
        .await
        .unwrap();
    assert!(ua.starts_with("feed-snapshot/"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let addr = spawn_server().await;
    let url = format!("http://{addr}/down");
    let err = source(Duration::from_secs(5)).retrieve(&url).await.unwrap_err();
    match err {
        FetchError::Status { url: u, status } => {
            assert_eq!(u, url);
            assert_eq!(status, 503);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_hits_client_timeout() {
    let addr = spawn_server().await;
    let err = source(Duration::from_millis(200))
        .retrieve(&format!("http://{addr}/slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_host_is_a_request_error() {
    // bind then drop to get a port nobody listens on
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let err = source(Duration::from_secs(2))
        .retrieve(&format!("http://127.0.0.1:{port}/feed"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn fetcher_parses_and_filters_over_http() {
    let addr = spawn_server().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let fetcher = Fetcher::new(Arc::new(source(Duration::from_secs(5))));
    let entries = fetcher.fetch_at(&format!("http://{addr}/feed"), now).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].title, "Oil slips on demand worries - Reuters");
}

#[tokio::test]
async fn http_to_file_store_end_to_end() {
    let addr = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let pipeline = Pipeline::new(
        vec![
            FeedConfig::new(format!("http://{addr}/feed"), "business_news"),
            FeedConfig::new(format!("http://{addr}/down"), "broken_feed"),
        ],
        Arc::new(source(Duration::from_secs(5))),
        store.clone(),
    );

    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let summary = pipeline.run_at(now).await.unwrap();
    assert_eq!(summary.updated(), 1);
    assert_eq!(summary.failed(), 1);

    let stored = store.list("business_news").await.unwrap();
    let sources: Vec<&str> = stored.iter().map(|s| s.record.source.as_str()).collect();
    assert_eq!(sources, ["Financial Times", "Reuters"]);
    assert!(store.path_for("business_news").exists());
    assert!(!store.path_for("broken_feed").exists());
}
