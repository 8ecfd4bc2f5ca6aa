//! Batch acquisition on top of the fetch coordinator
//!
//! Paginates the activity listing, filters mappable rides, and pulls
//! validated tracks per activity with per-item failure isolation.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{FetcherError, FetcherResult};
use crate::services::coordinator::FetchCoordinator;
use crate::traits::{ActivityTransport, CacheStore};
use crate::types::{FetchOptions, FetchPayload, LogicalQuery, MAX_PAGE_SIZE};
use shared::{ActivityRecord, SummaryActivity};

/// One activity that could not be fetched during a batch
#[derive(Debug)]
pub struct BatchFailure {
    pub activity_id: u64,
    pub error: FetcherError,
}

/// Result of a batch fetch: validated records plus per-item failures
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<ActivityRecord>,
    pub failures: Vec<BatchFailure>,
}

/// High-level acquisition over many activities
pub struct ActivityLibrary<T, C>
where
    T: ActivityTransport,
    C: CacheStore,
{
    coordinator: FetchCoordinator<T, C>,
}

impl<T, C> ActivityLibrary<T, C>
where
    T: ActivityTransport,
    C: CacheStore,
{
    pub fn new(coordinator: FetchCoordinator<T, C>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &FetchCoordinator<T, C> {
        &self.coordinator
    }

    /// List rides with map data from the last `days_back` days, newest
    /// first, paginating until a short page marks the end.
    pub async fn recent_rides(
        &self,
        days_back: u32,
        options: FetchOptions,
    ) -> FetcherResult<Vec<SummaryActivity>> {
        let after_epoch_s = Some((Utc::now() - chrono::Duration::days(days_back as i64)).timestamp());

        let mut rides = Vec::new();
        let mut page = 1u32;
        loop {
            let query = LogicalQuery::ActivityPage {
                per_page: MAX_PAGE_SIZE,
                page,
                after_epoch_s,
            };
            let outcome = self.coordinator.fetch(&query, options).await?;
            let FetchPayload::Page(activities) = outcome.payload else {
                return Err(FetcherError::FetchFailed {
                    reason: "unexpected payload kind for activity page".to_string(),
                });
            };

            let fetched = activities.len();
            rides.extend(activities.into_iter().filter(|a| a.is_mappable_ride()));

            if fetched < MAX_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        rides.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        info!(days_back, rides = rides.len(), "listed mappable rides");
        Ok(rides)
    }

    /// Fetch validated tracks for the most recent `limit` rides.
    ///
    /// One activity's failure never aborts its siblings; failures are
    /// collected per item. `RateExhausted` is the exception: it is a hard
    /// stop for the whole operation.
    pub async fn rides_with_tracks(
        &self,
        days_back: u32,
        limit: usize,
        options: FetchOptions,
    ) -> FetcherResult<BatchOutcome> {
        let mut rides = self.recent_rides(days_back, options).await?;
        rides.truncate(limit);

        let mut outcome = BatchOutcome::default();
        for ride in rides {
            let query = LogicalQuery::ActivityStreams {
                activity_id: ride.id,
            };
            match self.coordinator.fetch(&query, options).await {
                Ok(fetched) => {
                    let FetchPayload::Track(track) = fetched.payload else {
                        outcome.failures.push(BatchFailure {
                            activity_id: ride.id,
                            error: FetcherError::FetchFailed {
                                reason: "unexpected payload kind for activity streams".to_string(),
                            },
                        });
                        continue;
                    };
                    outcome.records.push(ActivityRecord {
                        id: ride.id,
                        name: ride.name,
                        start_time: ride.start_date,
                        distance_m: ride.distance,
                        moving_time_s: ride.moving_time,
                        track,
                    });
                }
                Err(FetcherError::RateExhausted) => return Err(FetcherError::RateExhausted),
                Err(error) => {
                    warn!(activity_id = ride.id, %error, "skipping activity");
                    outcome.failures.push(BatchFailure {
                        activity_id: ride.id,
                        error,
                    });
                }
            }
        }

        info!(
            records = outcome.records.len(),
            skipped = outcome.failures.len(),
            "batch fetch complete"
        );
        Ok(outcome)
    }
}
