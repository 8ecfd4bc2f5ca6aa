//! Resilient acquisition and cache subsystem for activity data
//!
//! Turns the rate-limited Strava API into a locally consistent, validated
//! dataset: request governance across rolling windows, retry with jittered
//! exponential backoff, fingerprint-keyed caching with TTL, and coordinate
//! stream validation.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{FetcherError, FetcherResult};
pub use services::*;
pub use traits::*;
pub use types::*;
