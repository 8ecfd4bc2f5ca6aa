//! Tests for the rate governor

use std::sync::Arc;
use std::time::Duration;

use crate::services::rate_governor::RateGovernor;
use crate::types::{Admission, WindowConfig};

fn single_window(budget: u32, duration: Duration) -> Vec<WindowConfig> {
    vec![WindowConfig { budget, duration }]
}

#[tokio::test]
async fn test_admits_until_budget_then_delays() {
    let governor = RateGovernor::new(
        &single_window(3, Duration::from_secs(60)),
        Duration::from_secs(120),
    );

    for _ in 0..3 {
        assert_eq!(governor.admit().await, Admission::Admit);
    }
    match governor.admit().await {
        Admission::Delay(wait) => assert!(wait <= Duration::from_secs(60)),
        other => panic!("expected Delay, got {other:?}"),
    }
    assert_eq!(governor.admitted_count(), 3);
}

#[tokio::test]
async fn test_rejects_when_wait_exceeds_policy_bound() {
    let governor = RateGovernor::new(
        &single_window(1, Duration::from_secs(3600)),
        Duration::from_millis(10),
    );

    assert_eq!(governor.admit().await, Admission::Admit);
    assert_eq!(governor.admit().await, Admission::Reject);
}

#[tokio::test]
async fn test_every_window_must_have_budget() {
    // Generous burst window, exhausted long window.
    let governor = RateGovernor::new(
        &[
            WindowConfig {
                budget: 100,
                duration: Duration::from_secs(1),
            },
            WindowConfig {
                budget: 2,
                duration: Duration::from_secs(3600),
            },
        ],
        Duration::from_secs(7200),
    );

    assert_eq!(governor.admit().await, Admission::Admit);
    assert_eq!(governor.admit().await, Admission::Admit);
    assert!(matches!(governor.admit().await, Admission::Delay(_)));
}

#[tokio::test]
async fn test_window_resets_after_duration_elapses() {
    let governor = RateGovernor::new(
        &single_window(1, Duration::from_millis(50)),
        Duration::from_secs(60),
    );

    assert_eq!(governor.admit().await, Admission::Admit);
    assert!(matches!(governor.admit().await, Admission::Delay(_)));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(governor.admit().await, Admission::Admit);
    assert_eq!(governor.admitted_count(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_never_over_admit() {
    let budget = 10u32;
    let governor = Arc::new(RateGovernor::new(
        &single_window(budget, Duration::from_secs(3600)),
        Duration::from_secs(7200),
    ));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let governor = governor.clone();
        handles.push(tokio::spawn(async move {
            matches!(governor.admit().await, Admission::Admit)
        }));
    }

    let mut admits = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admits += 1;
        }
    }

    assert_eq!(admits, budget);
    assert_eq!(governor.admitted_count(), budget as u64);
}
