// tests/file_store.rs
use chrono::{Duration, TimeZone, Utc};
use feed_snapshot::{CanonicalRecord, FileStore, SnapshotStore, StoreError};
use std::fs;

fn rec(title: &str, minutes_ago: i64) -> CanonicalRecord {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    CanonicalRecord {
        title: title.into(),
        link: format!("https://example.com/{title}"),
        source: "Example Daily".into(),
        published_at: now - Duration::minutes(minutes_ago),
        published_at_raw: Some((now - Duration::minutes(minutes_ago)).to_rfc2822()),
        created_at: now,
    }
}

#[tokio::test]
async fn insert_list_erase_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("nested/data")).unwrap();

    assert!(store.list("news_a").await.unwrap().is_empty());
    assert_eq!(store.erase_all("news_a").await.unwrap(), 0);

    let written = store
        .insert_all("news_a", &[rec("one", 5), rec("two", 10)])
        .await
        .unwrap();
    assert_eq!(written, 2);

    let stored = store.list("news_a").await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].record, rec("one", 5));
    assert_ne!(stored[0].id, stored[1].id);

    // collections are independent files
    store.insert_all("news_b", &[rec("three", 1)]).await.unwrap();
    assert_eq!(store.erase_all("news_a").await.unwrap(), 2);
    assert!(store.list("news_a").await.unwrap().is_empty());
    assert_eq!(store.list("news_b").await.unwrap().len(), 1);
}

#[tokio::test]
async fn on_disk_shape_is_camel_case_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.insert_all("news_a", &[rec("one", 5)]).await.unwrap();

    let raw = fs::read_to_string(store.path_for("news_a")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let doc = &v[0];
    assert!(doc["id"].is_string());
    assert_eq!(doc["title"], "one");
    assert_eq!(doc["source"], "Example Daily");
    assert!(doc["publishedAt"].is_string());
    assert!(doc["publishedAtRaw"].is_string());
    assert!(doc["createdAt"].is_string());

    // no temp files left behind
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["news_a.json"]);
}

#[tokio::test]
async fn reopened_store_sees_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileStore::open(dir.path()).unwrap();
        store.insert_all("news_a", &[rec("kept", 1)]).await.unwrap();
    }
    let store = FileStore::open(dir.path()).unwrap();
    let stored = store.list("news_a").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.title, "kept");
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    fs::write(store.path_for("news_a"), "{ half a document").unwrap();

    let err = store.list("news_a").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
    assert!(store.insert_all("news_a", &[rec("x", 1)]).await.is_err());
}
