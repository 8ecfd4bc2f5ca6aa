//! Service trait definitions for dependency injection

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{CacheEntry, FetchPayload, InvalidateSelector, LogicalQuery, RequestFingerprint};
use shared::TransportFailure;

/// Remote activity API transport
#[mockall::automock]
#[async_trait]
pub trait ActivityTransport: Send + Sync {
    /// Issue one request attempt for a logical query, returning the raw
    /// JSON payload on success
    async fn issue_request(
        &self,
        query: &LogicalQuery,
    ) -> Result<serde_json::Value, TransportFailure>;
}

/// Key/value persistence with expiry; no knowledge of the network.
///
/// Caching is a performance optimization, never a correctness dependency:
/// implementations degrade storage faults to misses and no-ops.
#[mockall::automock]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry. `None` if absent, or if expired and `allow_stale`
    /// is false.
    async fn get(&self, fingerprint: &RequestFingerprint, allow_stale: bool)
        -> Option<CacheEntry>;

    /// Atomically overwrite the entry for a fingerprint; a concurrent
    /// reader never observes a half-written entry.
    async fn put(&self, fingerprint: &RequestFingerprint, payload: FetchPayload, ttl: Duration);

    /// Remove matching entries immediately, returning how many went away
    async fn invalidate(&self, selector: InvalidateSelector) -> usize;

    /// Remove entries past their ttl. Optimization only; expiry is always
    /// also enforced at read time.
    async fn sweep_expired(&self) -> usize;
}
