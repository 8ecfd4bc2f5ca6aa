//! Fetcher core types: logical queries, fingerprints, cache entries,
//! attempt tracking, and configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{FetcherError, FetcherResult};
use shared::{ErrorClass, SummaryActivity, TrackPoint};

/// Largest page the activity listing endpoint will serve
pub const MAX_PAGE_SIZE: u16 = 200;

/// The caller's intent: a resource plus its parameters, independent of
/// caching and retry mechanics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalQuery {
    /// One page of the athlete's activity listing
    ActivityPage {
        per_page: u16,
        page: u32,
        after_epoch_s: Option<i64>,
    },
    /// GPS/elevation/velocity streams for one activity
    ActivityStreams { activity_id: u64 },
}

impl LogicalQuery {
    pub fn kind(&self) -> QueryKind {
        match self {
            LogicalQuery::ActivityPage { .. } => QueryKind::Page,
            LogicalQuery::ActivityStreams { .. } => QueryKind::Streams,
        }
    }
}

/// Resource kind of a logical query, also the fingerprint prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryKind {
    Page,
    Streams,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Page => "page",
            QueryKind::Streams => "streams",
        }
    }
}

/// Deterministic identifier for a logical query, used as the cache key.
///
/// Format is `<kind>-<digest>` so that whole resource kinds can be matched
/// by prefix. Derivation is pure: equal queries always produce equal
/// fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn derive(query: &LogicalQuery) -> Self {
        let canonical = match query {
            LogicalQuery::ActivityPage {
                per_page,
                page,
                after_epoch_s,
            } => format!(
                "page:{per_page}:{page}:{}",
                after_epoch_s.map(|a| a.to_string()).unwrap_or_default()
            ),
            LogicalQuery::ActivityStreams { activity_id } => format!("streams:{activity_id}"),
        };
        let digest = Sha256::digest(canonical.as_bytes());
        RequestFingerprint(format!(
            "{}-{}",
            query.kind().as_str(),
            hex::encode(&digest[..12])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated payload held by a cache entry and returned by a fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchPayload {
    /// A page of the activity listing
    Page(Vec<SummaryActivity>),
    /// A validated coordinate track for one activity
    Track(Vec<TrackPoint>),
}

/// One cached fetch result. Owned exclusively by the cache store: created
/// on a validated fetch, overwritten on refresh, destroyed on sweep or
/// invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: RequestFingerprint,
    pub payload: FetchPayload,
    pub created_at: DateTime<Utc>,
    /// Seconds the entry stays fresh after `created_at`
    pub ttl_s: u64,
    /// On-disk layout version; entries from other versions read as misses
    pub version: u32,
}

impl CacheEntry {
    pub const LAYOUT_VERSION: u32 = 1;

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= chrono::Duration::seconds(self.ttl_s as i64)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Which cache entries `invalidate` removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidateSelector {
    Fingerprint(RequestFingerprint),
    Kind(QueryKind),
    All,
}

/// Rate governor admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// Wait this long for the earliest window reset, then ask again
    Delay(Duration),
    /// No useful wait horizon within policy bounds; hard stop
    Reject,
}

/// Retry policy decision for one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry(Duration),
    Abandon,
}

/// Mutable attempt tracking for a single logical fetch. Ephemeral: owned
/// by the coordinator, discarded on success or final abandonment.
#[derive(Debug, Clone, Default)]
pub struct AttemptState {
    /// Attempts issued so far (completed, whether failed or not)
    pub attempt_number: u32,
    pub last_error_class: Option<ErrorClass>,
    pub next_allowed_at: Option<Instant>,
}

impl AttemptState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, class: ErrorClass) {
        self.attempt_number += 1;
        self.last_error_class = Some(class);
    }
}

/// Per-call fetch options
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Serve an expired cache entry instead of refetching
    pub allow_stale: bool,
    /// Overall operation deadline; cooperative waits never extend past it
    pub deadline: Option<Instant>,
}

/// Successful fetch result
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub payload: FetchPayload,
    /// True when an expired entry was served under `allow_stale`
    pub stale: bool,
    pub from_cache: bool,
}

/// One rate window: budget over a fixed duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub budget: u32,
    pub duration: Duration,
}

/// Retry/backoff tuning. The numbers are configuration constants, not part
/// of the structural contract.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    /// Bounded random offset as a fraction of the computed delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 4,
            jitter: 0.25,
        }
    }
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub access_token: String,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub windows: Vec<WindowConfig>,
    /// Longest admission wait worth taking before rejecting outright
    pub max_admit_delay: Duration,
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.strava.com/api/v3".to_string(),
            access_token: String::new(),
            cache_dir: PathBuf::from("./cache"),
            cache_ttl: Duration::from_secs(24 * 3600),
            windows: vec![
                // Burst window and daily quota
                WindowConfig {
                    budget: 100,
                    duration: Duration::from_secs(15 * 60),
                },
                WindowConfig {
                    budget: 1000,
                    duration: Duration::from_secs(24 * 3600),
                },
            ],
            max_admit_delay: Duration::from_secs(15 * 60),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl FetcherConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for everything except the access token.
    pub fn from_env() -> FetcherResult<Self> {
        let mut config = Self::default();

        config.access_token =
            env::var("STRAVA_ACCESS_TOKEN").map_err(|_| FetcherError::ConfigError {
                message: "STRAVA_ACCESS_TOKEN is not set".to_string(),
            })?;

        if let Ok(url) = env::var("STRAVA_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(dir) = env::var("FETCHER_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Ok(hours) = env::var("FETCHER_CACHE_TTL_HOURS") {
            let hours: u64 = hours.parse().map_err(|_| FetcherError::ConfigError {
                message: format!("FETCHER_CACHE_TTL_HOURS is not a number: {hours}"),
            })?;
            config.cache_ttl = Duration::from_secs(hours * 3600);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_idempotent() {
        let query = LogicalQuery::ActivityPage {
            per_page: 200,
            page: 3,
            after_epoch_s: Some(1_700_000_000),
        };
        assert_eq!(
            RequestFingerprint::derive(&query),
            RequestFingerprint::derive(&query.clone())
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_queries() {
        let a = RequestFingerprint::derive(&LogicalQuery::ActivityStreams { activity_id: 1 });
        let b = RequestFingerprint::derive(&LogicalQuery::ActivityStreams { activity_id: 2 });
        let c = RequestFingerprint::derive(&LogicalQuery::ActivityPage {
            per_page: 200,
            page: 1,
            after_epoch_s: None,
        });
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_fingerprint_carries_kind_prefix() {
        let fp = RequestFingerprint::derive(&LogicalQuery::ActivityStreams { activity_id: 42 });
        assert!(fp.as_str().starts_with("streams-"));

        let fp = RequestFingerprint::derive(&LogicalQuery::ActivityPage {
            per_page: 200,
            page: 1,
            after_epoch_s: None,
        });
        assert!(fp.as_str().starts_with("page-"));
    }

    #[test]
    fn test_cache_entry_expiry() {
        let entry = CacheEntry {
            fingerprint: RequestFingerprint::derive(&LogicalQuery::ActivityStreams {
                activity_id: 1,
            }),
            payload: FetchPayload::Track(vec![]),
            created_at: Utc::now(),
            ttl_s: 3600,
            version: CacheEntry::LAYOUT_VERSION,
        };
        assert!(!entry.is_expired());
        assert!(entry.is_expired_at(entry.created_at + chrono::Duration::seconds(3601)));
        assert!(!entry.is_expired_at(entry.created_at + chrono::Duration::seconds(3599)));
    }

    #[test]
    fn test_from_env_rejects_non_numeric_ttl() {
        std::env::set_var("STRAVA_ACCESS_TOKEN", "test-token");
        std::env::set_var("FETCHER_CACHE_TTL_HOURS", "soon");

        let result = FetcherConfig::from_env();
        assert!(matches!(
            result,
            Err(FetcherError::ConfigError { message }) if message.contains("FETCHER_CACHE_TTL_HOURS")
        ));

        std::env::remove_var("FETCHER_CACHE_TTL_HOURS");
        std::env::remove_var("STRAVA_ACCESS_TOKEN");
    }

    #[test]
    fn test_attempt_state_records_failures() {
        let mut attempt = AttemptState::new();
        assert_eq!(attempt.attempt_number, 0);
        attempt.record_failure(ErrorClass::Throttled);
        attempt.record_failure(ErrorClass::Transient);
        assert_eq!(attempt.attempt_number, 2);
        assert_eq!(attempt.last_error_class, Some(ErrorClass::Transient));
    }
}
