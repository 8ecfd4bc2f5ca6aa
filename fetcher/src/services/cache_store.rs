//! Disk-backed cache store
//!
//! One JSON file per fingerprint under the cache directory. Writes go to a
//! temporary file first and are renamed into place, so a concurrent reader
//! never observes a half-written entry. Storage faults degrade to misses
//! and no-ops: caching is an optimization, never a correctness dependency.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::traits::CacheStore;
use crate::types::{CacheEntry, FetchPayload, InvalidateSelector, RequestFingerprint};

/// Real cache store writing entries under a cache directory
pub struct DiskCacheStore {
    cache_dir: PathBuf,
}

impl DiskCacheStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn entry_path(&self, fingerprint: &RequestFingerprint) -> PathBuf {
        self.cache_dir.join(format!("{}.json", fingerprint.as_str()))
    }

    /// Read and parse one entry file; corrupted or foreign-version files
    /// are removed best-effort and read as misses.
    async fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(_) => return None,
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if entry.version == CacheEntry::LAYOUT_VERSION => Some(entry),
            Ok(_) => {
                let _ = fs::remove_file(path).await;
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "removing corrupted cache entry");
                let _ = fs::remove_file(path).await;
                None
            }
        }
    }

    /// List entry files, optionally restricted to a filename prefix
    async fn entry_files(&self, prefix: Option<&str>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(_) => return files,
        };
        while let Ok(Some(dir_entry)) = dir.next_entry().await {
            let path = dir_entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            if let Some(prefix) = prefix {
                if !name.starts_with(prefix) {
                    continue;
                }
            }
            files.push(path);
        }
        files
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn get(&self, fingerprint: &RequestFingerprint, allow_stale: bool) -> Option<CacheEntry> {
        let path = self.entry_path(fingerprint);
        let entry = self.read_entry(&path).await?;

        if entry.is_expired() && !allow_stale {
            debug!(%fingerprint, "cache entry expired, treating as miss");
            return None;
        }
        debug!(%fingerprint, stale = entry.is_expired(), "cache hit");
        Some(entry)
    }

    async fn put(&self, fingerprint: &RequestFingerprint, payload: FetchPayload, ttl: Duration) {
        if let Err(e) = fs::create_dir_all(&self.cache_dir).await {
            warn!(dir = %self.cache_dir.display(), error = %e, "cache dir unavailable, skipping put");
            return;
        }

        let entry = CacheEntry {
            fingerprint: fingerprint.clone(),
            payload,
            created_at: chrono::Utc::now(),
            ttl_s: ttl.as_secs(),
            version: CacheEntry::LAYOUT_VERSION,
        };
        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(%fingerprint, error = %e, "unserializable cache entry, skipping put");
                return;
            }
        };

        // Unique temp name keeps concurrent puts of the same key from
        // clobbering each other's in-progress file.
        let tmp_path = self
            .cache_dir
            .join(format!(".{}-{}.tmp", fingerprint.as_str(), Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, contents).await {
            warn!(%fingerprint, error = %e, "cache write failed, skipping put");
            let _ = fs::remove_file(&tmp_path).await;
            return;
        }
        if let Err(e) = fs::rename(&tmp_path, self.entry_path(fingerprint)).await {
            warn!(%fingerprint, error = %e, "cache rename failed, skipping put");
            let _ = fs::remove_file(&tmp_path).await;
        }
    }

    async fn invalidate(&self, selector: InvalidateSelector) -> usize {
        let files = match &selector {
            InvalidateSelector::Fingerprint(fingerprint) => vec![self.entry_path(fingerprint)],
            InvalidateSelector::Kind(kind) => {
                self.entry_files(Some(&format!("{}-", kind.as_str()))).await
            }
            InvalidateSelector::All => self.entry_files(None).await,
        };

        let mut removed = 0;
        for path in files {
            if fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        debug!(?selector, removed, "cache invalidation");
        removed
    }

    async fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for path in self.entry_files(None).await {
            if let Some(entry) = self.read_entry(&path).await {
                if entry.is_expired() && fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
            }
        }
        debug!(removed, "swept expired cache entries");
        removed
    }
}
