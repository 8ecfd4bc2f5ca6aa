//! Fetcher binary entry point
//!
//! Thin glue: argument parsing, config, and printing. All acquisition
//! logic lives in the library.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fetcher::services::{
    ActivityLibrary, DiskCacheStore, FetchCoordinator, RateGovernor, RetryPolicy, StravaTransport,
};
use fetcher::traits::CacheStore;
use fetcher::types::{FetchOptions, FetcherConfig, InvalidateSelector};

#[derive(Parser)]
#[command(name = "fetcher")]
#[command(about = "Fetch, validate, and cache Strava ride data")]
struct Args {
    /// How many days of history to cover
    #[arg(long, default_value_t = 365)]
    days_back: u32,

    /// Maximum number of activities to fetch tracks for
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Cache directory (defaults to ./cache or FETCHER_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Serve expired cache entries instead of refetching
    #[arg(long)]
    use_cached: bool,

    /// Invalidate all cached entries before fetching
    #[arg(long)]
    force_refresh: bool,

    /// Remove expired cache entries and exit
    #[arg(long)]
    sweep: bool,

    /// Overall operation timeout in seconds
    #[arg(long)]
    timeout_s: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    shared::logging::init_tracing_with_level(Some(&args.log_level));

    // Sweeping needs no credentials, only the cache directory.
    if args.sweep {
        let cache_dir = args.cache_dir.clone().unwrap_or_else(|| {
            std::env::var("FETCHER_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./cache"))
        });
        let cache = DiskCacheStore::new(cache_dir);
        let removed = cache.sweep_expired().await;
        println!("Removed {removed} expired cache entries");
        return Ok(());
    }

    let mut config = FetcherConfig::from_env().context("loading fetcher configuration")?;
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }

    let cache = DiskCacheStore::new(config.cache_dir.clone());
    let governor = Arc::new(RateGovernor::new(&config.windows, config.max_admit_delay));
    let transport = StravaTransport::new(&config).context("building Strava transport")?;
    let coordinator = FetchCoordinator::new(
        transport,
        cache,
        governor.clone(),
        RetryPolicy::new(config.retry.clone()),
        config.cache_ttl,
    );
    let library = ActivityLibrary::new(coordinator);

    if args.force_refresh {
        let removed = library
            .coordinator()
            .invalidate(InvalidateSelector::All)
            .await;
        println!("Invalidated {removed} cache entries");
    }

    let options = FetchOptions {
        allow_stale: args.use_cached,
        deadline: args.timeout_s.map(|s| Instant::now() + Duration::from_secs(s)),
    };

    let outcome = library
        .rides_with_tracks(args.days_back, args.limit, options)
        .await
        .context("fetching rides")?;

    for record in &outcome.records {
        println!(
            "{}  {:40}  {:7.1} km  {:>8}  {} points",
            record.start_time.format("%Y-%m-%d"),
            record.name,
            record.distance_m / 1000.0,
            format_duration(record.moving_time_s),
            record.track.len(),
        );
    }
    if !outcome.failures.is_empty() {
        println!("Skipped {} activities:", outcome.failures.len());
        for failure in &outcome.failures {
            println!("  {}: {}", failure.activity_id, failure.error);
        }
    }
    println!(
        "Fetched {} activities ({} remote requests admitted)",
        outcome.records.len(),
        governor.admitted_count()
    );

    Ok(())
}

fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
