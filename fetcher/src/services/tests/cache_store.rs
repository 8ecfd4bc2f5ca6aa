//! Tests for the disk cache store

use std::time::Duration;
use tempfile::tempdir;

use crate::services::cache_store::DiskCacheStore;
use crate::traits::CacheStore;
use crate::types::{FetchPayload, InvalidateSelector, LogicalQuery, QueryKind, RequestFingerprint};
use shared::TrackPoint;

fn track_payload() -> FetchPayload {
    FetchPayload::Track(vec![
        TrackPoint {
            lat: 40.70,
            lon: -74.00,
            elapsed_s: 0,
            altitude_m: None,
            velocity_ms: None,
        },
        TrackPoint {
            lat: 40.71,
            lon: -74.01,
            elapsed_s: 10,
            altitude_m: None,
            velocity_ms: None,
        },
    ])
}

fn streams_fingerprint(activity_id: u64) -> RequestFingerprint {
    RequestFingerprint::derive(&LogicalQuery::ActivityStreams { activity_id })
}

#[tokio::test]
async fn test_put_then_get_roundtrip() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let fingerprint = streams_fingerprint(1);

    cache
        .put(&fingerprint, track_payload(), Duration::from_secs(3600))
        .await;

    let entry = cache.get(&fingerprint, false).await.unwrap();
    assert_eq!(entry.payload, track_payload());
    assert_eq!(entry.fingerprint, fingerprint);
    assert!(!entry.is_expired());
}

#[tokio::test]
async fn test_absent_key_is_a_miss() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());

    assert!(cache.get(&streams_fingerprint(404), false).await.is_none());
}

#[tokio::test]
async fn test_expired_entry_misses_unless_stale_allowed() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let fingerprint = streams_fingerprint(2);

    cache.put(&fingerprint, track_payload(), Duration::ZERO).await;

    assert!(cache.get(&fingerprint, false).await.is_none());

    let entry = cache.get(&fingerprint, true).await.unwrap();
    assert!(entry.is_expired());
    assert_eq!(entry.payload, track_payload());
}

#[tokio::test]
async fn test_put_overwrites_existing_entry() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let fingerprint = streams_fingerprint(3);

    cache
        .put(&fingerprint, FetchPayload::Track(vec![]), Duration::from_secs(3600))
        .await;
    cache
        .put(&fingerprint, track_payload(), Duration::from_secs(3600))
        .await;

    let entry = cache.get(&fingerprint, false).await.unwrap();
    assert_eq!(entry.payload, track_payload());
}

#[tokio::test]
async fn test_invalidate_by_fingerprint() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let keep = streams_fingerprint(1);
    let gone = streams_fingerprint(2);

    cache.put(&keep, track_payload(), Duration::from_secs(3600)).await;
    cache.put(&gone, track_payload(), Duration::from_secs(3600)).await;

    let removed = cache
        .invalidate(InvalidateSelector::Fingerprint(gone.clone()))
        .await;
    assert_eq!(removed, 1);
    assert!(cache.get(&gone, true).await.is_none());
    assert!(cache.get(&keep, false).await.is_some());
}

#[tokio::test]
async fn test_invalidate_by_kind_prefix() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let streams = streams_fingerprint(1);
    let page = RequestFingerprint::derive(&LogicalQuery::ActivityPage {
        per_page: 200,
        page: 1,
        after_epoch_s: None,
    });

    cache.put(&streams, track_payload(), Duration::from_secs(3600)).await;
    cache
        .put(&page, FetchPayload::Page(vec![]), Duration::from_secs(3600))
        .await;

    let removed = cache.invalidate(InvalidateSelector::Kind(QueryKind::Streams)).await;
    assert_eq!(removed, 1);
    assert!(cache.get(&streams, true).await.is_none());
    assert!(cache.get(&page, false).await.is_some());
}

#[tokio::test]
async fn test_invalidate_all() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());

    for id in 0..3 {
        cache
            .put(&streams_fingerprint(id), track_payload(), Duration::from_secs(3600))
            .await;
    }

    assert_eq!(cache.invalidate(InvalidateSelector::All).await, 3);
    assert!(cache.get(&streams_fingerprint(0), true).await.is_none());
}

#[tokio::test]
async fn test_sweep_removes_only_expired_entries() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let fresh = streams_fingerprint(1);
    let expired = streams_fingerprint(2);

    cache.put(&fresh, track_payload(), Duration::from_secs(3600)).await;
    cache.put(&expired, track_payload(), Duration::ZERO).await;

    assert_eq!(cache.sweep_expired().await, 1);
    assert!(cache.get(&fresh, false).await.is_some());
    assert!(cache.get(&expired, true).await.is_none());
}

#[tokio::test]
async fn test_corrupted_entry_reads_as_miss() {
    let dir = tempdir().unwrap();
    let cache = DiskCacheStore::new(dir.path().to_path_buf());
    let fingerprint = streams_fingerprint(9);

    std::fs::write(
        dir.path().join(format!("{}.json", fingerprint.as_str())),
        "not json at all",
    )
    .unwrap();

    assert!(cache.get(&fingerprint, true).await.is_none());
}

#[tokio::test]
async fn test_unavailable_storage_degrades_silently() {
    // Point the cache at a path that is a file, not a directory.
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();

    let cache = DiskCacheStore::new(blocker);
    let fingerprint = streams_fingerprint(1);

    // put no-ops, get misses; neither panics or errors.
    cache
        .put(&fingerprint, track_payload(), Duration::from_secs(3600))
        .await;
    assert!(cache.get(&fingerprint, false).await.is_none());
    assert_eq!(cache.sweep_expired().await, 0);
}
