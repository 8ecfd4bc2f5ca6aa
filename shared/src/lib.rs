//! Shared types for the activity acquisition system
//!
//! Contains types used both by the fetcher core and by downstream
//! consumers (analytics, CLI output). Component-internal types live in
//! their respective crates.

pub mod logging;
pub mod types;

pub use types::*;
