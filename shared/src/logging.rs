//! Logging utilities for consistent tracing across binaries

use tracing_subscriber::{fmt, EnvFilter};

/// Default per-crate filter; RUST_LOG overrides it entirely.
fn default_filter(base_level: &str) -> String {
    format!("fetcher={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the tracing subscriber writing compact lines to stdout
pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Initialize tracing with an explicit base level (e.g. from a CLI flag)
pub fn init_tracing_with_level(log_level: Option<&str>) {
    let base_level = log_level.unwrap_or("info");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(base_level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}
