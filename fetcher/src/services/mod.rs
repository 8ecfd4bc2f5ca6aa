//! Fetcher service implementations

pub mod cache_store;
pub mod coordinator;
pub mod library;
pub mod rate_governor;
pub mod retry_policy;
pub mod strava_client;
pub mod validator;

#[cfg(test)]
pub mod tests;

pub use cache_store::*;
pub use coordinator::*;
pub use library::*;
pub use rate_governor::*;
pub use retry_policy::*;
pub use strava_client::*;
pub use validator::*;
