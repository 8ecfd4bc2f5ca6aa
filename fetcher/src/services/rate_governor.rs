//! Request budget governance over rolling windows
//!
//! The governor is the single shared mutable resource across concurrent
//! fetches. Admission checks and counter increments happen in one locked
//! step, so concurrent callers can never jointly over-admit past budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{Admission, WindowConfig};

/// One fixed time bucket with a request budget
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    duration: Duration,
    budget: u32,
    requests_made: u32,
}

impl RateWindow {
    fn from_config(config: &WindowConfig, now: Instant) -> Self {
        Self {
            started_at: now,
            duration: config.duration,
            budget: config.budget,
            requests_made: 0,
        }
    }

    /// Reset the bucket once its duration has elapsed
    fn roll_if_elapsed(&mut self, now: Instant) {
        if now.duration_since(self.started_at) >= self.duration {
            self.started_at = now;
            self.requests_made = 0;
        }
    }

    fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.requests_made)
    }

    fn resets_in(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.duration_since(self.started_at))
    }
}

/// Tracks consumed request budget and decides admit/delay/reject
pub struct RateGovernor {
    windows: Mutex<Vec<RateWindow>>,
    max_delay: Duration,
    admitted: AtomicU64,
}

impl RateGovernor {
    pub fn new(configs: &[WindowConfig], max_delay: Duration) -> Self {
        let now = Instant::now();
        Self {
            windows: Mutex::new(
                configs
                    .iter()
                    .map(|c| RateWindow::from_config(c, now))
                    .collect(),
            ),
            max_delay,
            admitted: AtomicU64::new(0),
        }
    }

    /// Decide whether a request may go out now.
    ///
    /// A request is admitted only when every window has budget; on admit,
    /// every window's counter is incremented before returning, inside the
    /// same lock. Otherwise the caller gets the minimum wait until the
    /// earliest exhausted window resets, or `Reject` when that wait
    /// exceeds the policy bound.
    pub async fn admit(&self) -> Admission {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        for window in windows.iter_mut() {
            window.roll_if_elapsed(now);
        }

        if windows.iter().all(|w| w.remaining() > 0) {
            for window in windows.iter_mut() {
                window.requests_made += 1;
            }
            self.admitted.fetch_add(1, Ordering::Relaxed);
            return Admission::Admit;
        }

        let wait = windows
            .iter()
            .filter(|w| w.remaining() == 0)
            .map(|w| w.resets_in(now))
            .min()
            .unwrap_or_default();

        if wait > self.max_delay {
            debug!(?wait, max_delay = ?self.max_delay, "rejecting: wait horizon beyond policy bound");
            Admission::Reject
        } else {
            debug!(?wait, "delaying until budget resets");
            Admission::Delay(wait)
        }
    }

    /// Total admissions granted since construction
    pub fn admitted_count(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }
}
