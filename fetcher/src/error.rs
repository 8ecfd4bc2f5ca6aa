//! Fetcher error types

use thiserror::Error;

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Terminal failures surfaced to callers of the fetch coordinator
#[derive(Error, Debug)]
pub enum FetcherError {
    /// Request budget is unavailable within policy bounds for this
    /// operation; a hard stop, not something to retry.
    #[error("Rate budget exhausted for this operation")]
    RateExhausted,

    /// Retries exhausted or the remote rejected the request permanently
    #[error("Fetch failed: {reason}")]
    FetchFailed { reason: String },

    /// Remote data was structurally unusable after validation
    #[error("Insufficient data after validation: {reason}")]
    InsufficientData { reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
