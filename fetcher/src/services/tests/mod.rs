//! Service unit tests

pub mod cache_store;
pub mod rate_governor;
