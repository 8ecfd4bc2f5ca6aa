//! Fetch coordination
//!
//! Orchestrates one logical fetch as an explicit state machine:
//! CheckCache -> Govern -> Fetch -> Validate -> Commit, with cooperative,
//! deadline-bounded waits at the Govern and retry-backoff steps.
//!
//! Terminal states: fresh success, stale success (flagged), RateExhausted,
//! FetchFailed, InsufficientData. No state is re-entered after a terminal
//! state is reached for a given logical fetch.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FetcherError, FetcherResult};
use crate::services::rate_governor::RateGovernor;
use crate::services::retry_policy::RetryPolicy;
use crate::services::validator;
use crate::traits::{ActivityTransport, CacheStore};
use crate::types::{
    Admission, AttemptState, FetchOptions, FetchOutcome, FetchPayload, InvalidateSelector,
    LogicalQuery, RequestFingerprint, RetryAction,
};
use shared::{RawStreamSet, SummaryActivity};

/// A cooperative wait ran into the operation deadline
struct DeadlineExceeded;

/// Coordinates cache, governor, retry policy, transport, and validation
/// for logical fetches. Generic over the transport and cache store so
/// tests can inject mocks.
pub struct FetchCoordinator<T, C>
where
    T: ActivityTransport,
    C: CacheStore,
{
    transport: T,
    cache: C,
    governor: Arc<RateGovernor>,
    retry_policy: RetryPolicy,
    cache_ttl: Duration,
}

impl<T, C> FetchCoordinator<T, C>
where
    T: ActivityTransport,
    C: CacheStore,
{
    pub fn new(
        transport: T,
        cache: C,
        governor: Arc<RateGovernor>,
        retry_policy: RetryPolicy,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            governor,
            retry_policy,
            cache_ttl,
        }
    }

    /// The shared governor, e.g. for reporting admission totals
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Remove cache entries matching the selector
    pub async fn invalidate(&self, selector: InvalidateSelector) -> usize {
        self.cache.invalidate(selector).await
    }

    /// Remove expired cache entries
    pub async fn sweep_expired(&self) -> usize {
        self.cache.sweep_expired().await
    }

    /// Force-refresh: invalidate the entry for this query, then fetch
    /// without serving stale data.
    pub async fn refresh(
        &self,
        query: &LogicalQuery,
        options: FetchOptions,
    ) -> FetcherResult<FetchOutcome> {
        let fingerprint = RequestFingerprint::derive(query);
        self.cache
            .invalidate(InvalidateSelector::Fingerprint(fingerprint))
            .await;
        self.fetch(
            query,
            FetchOptions {
                allow_stale: false,
                ..options
            },
        )
        .await
    }

    /// Run one logical fetch to a terminal state
    pub async fn fetch(
        &self,
        query: &LogicalQuery,
        options: FetchOptions,
    ) -> FetcherResult<FetchOutcome> {
        let op_id = Uuid::new_v4();
        let fingerprint = RequestFingerprint::derive(query);

        // CheckCache
        if let Some(entry) = self.cache.get(&fingerprint, options.allow_stale).await {
            let stale = entry.is_expired();
            debug!(%op_id, %fingerprint, stale, "serving from cache");
            return Ok(FetchOutcome {
                payload: entry.payload,
                stale,
                from_cache: true,
            });
        }

        let mut attempt = AttemptState::new();
        loop {
            // Govern: every attempt re-consults the budget, since a retry
            // delay may span a window reset.
            loop {
                match self.governor.admit().await {
                    Admission::Admit => break,
                    Admission::Delay(delay) => {
                        debug!(%op_id, ?delay, "budget exhausted, waiting for window reset");
                        if self.wait(delay, options.deadline).await.is_err() {
                            warn!(%op_id, "deadline expired while waiting for budget");
                            return Err(FetcherError::RateExhausted);
                        }
                    }
                    Admission::Reject => {
                        warn!(%op_id, %fingerprint, "request budget exhausted, hard stop");
                        return Err(FetcherError::RateExhausted);
                    }
                }
            }

            // Fetch
            match self.transport.issue_request(query).await {
                Ok(raw) => {
                    // Validate + Commit
                    let payload = self.validate_payload(query, raw)?;
                    self.cache
                        .put(&fingerprint, payload.clone(), self.cache_ttl)
                        .await;
                    info!(%op_id, %fingerprint, attempts = attempt.attempt_number + 1, "fetch committed");
                    return Ok(FetchOutcome {
                        payload,
                        stale: false,
                        from_cache: false,
                    });
                }
                Err(failure) => {
                    let class = failure.class();
                    attempt.record_failure(class);
                    match self.retry_policy.next_action(&attempt, class) {
                        RetryAction::Retry(delay) => {
                            attempt.next_allowed_at = Some(Instant::now() + delay);
                            warn!(
                                %op_id,
                                attempt = attempt.attempt_number,
                                %failure,
                                ?delay,
                                "attempt failed, backing off"
                            );
                            if self.wait(delay, options.deadline).await.is_err() {
                                return Err(FetcherError::FetchFailed {
                                    reason: format!(
                                        "deadline expired during retry backoff after: {failure}"
                                    ),
                                });
                            }
                        }
                        RetryAction::Abandon => {
                            warn!(%op_id, attempt = attempt.attempt_number, %failure, "abandoning fetch");
                            return Err(FetcherError::FetchFailed {
                                reason: failure.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    /// Parse and validate a raw payload for its query kind.
    ///
    /// An all-rejected stream is an error and is NOT cached: an empty
    /// track must not poison the cache.
    fn validate_payload(
        &self,
        query: &LogicalQuery,
        raw: serde_json::Value,
    ) -> FetcherResult<FetchPayload> {
        match query {
            LogicalQuery::ActivityPage { .. } => {
                let page: Vec<SummaryActivity> =
                    serde_json::from_value(raw).map_err(|e| FetcherError::FetchFailed {
                        reason: format!("unparseable activity page: {e}"),
                    })?;
                Ok(FetchPayload::Page(page))
            }
            LogicalQuery::ActivityStreams { activity_id } => {
                let streams: RawStreamSet =
                    serde_json::from_value(raw).map_err(|e| FetcherError::FetchFailed {
                        reason: format!("unparseable streams for activity {activity_id}: {e}"),
                    })?;
                let outcome = validator::validate(&streams);
                if outcome.is_insufficient() {
                    return Err(FetcherError::InsufficientData {
                        reason: outcome.describe_rejections(),
                    });
                }
                if !outcome.rejections.is_empty() {
                    debug!(
                        activity_id,
                        dropped = outcome.rejections.len(),
                        kept = outcome.clean.len(),
                        "validator dropped points"
                    );
                }
                Ok(FetchPayload::Track(outcome.clean))
            }
        }
    }

    /// Cooperative wait bounded by the operation deadline
    async fn wait(&self, delay: Duration, deadline: Option<Instant>) -> Result<(), DeadlineExceeded> {
        if let Some(deadline) = deadline {
            if Instant::now() + delay >= deadline {
                return Err(DeadlineExceeded);
            }
        }
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
