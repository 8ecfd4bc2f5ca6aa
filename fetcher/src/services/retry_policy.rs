//! Retry/backoff policy
//!
//! Stateless decision function over an attempt state and an error class.
//! All mutable attempt tracking lives in `AttemptState`, owned by the
//! coordinator.

use rand::Rng;
use std::time::Duration;

use crate::types::{AttemptState, RetryAction, RetryConfig};
use shared::ErrorClass;

pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Decide the next action after a failed attempt.
    ///
    /// Permanent errors abandon immediately. Throttled and transient
    /// errors retry with exponentially increasing, capped, jittered
    /// delays, up to the attempt limit.
    pub fn next_action(&self, attempt: &AttemptState, error_class: ErrorClass) -> RetryAction {
        if error_class == ErrorClass::Permanent {
            return RetryAction::Abandon;
        }
        if attempt.attempt_number >= self.config.max_attempts {
            return RetryAction::Abandon;
        }

        // attempt_number is >= 1 here: the coordinator records the failure
        // before consulting the policy.
        let exponent = attempt.attempt_number.saturating_sub(1).min(16);
        let raw = self
            .config
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.config.max_delay);

        let delay = apply_jitter(raw, self.config.jitter).min(self.config.max_delay);
        RetryAction::Retry(delay)
    }
}

/// Bounded random offset keeps simultaneous failures from retrying in
/// lockstep.
fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return delay;
    }
    let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
    delay.mul_f64(factor.max(0.0))
}
