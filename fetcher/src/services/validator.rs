//! Coordinate stream validation
//!
//! Pure functions: raw parallel streams in, cleaned track out. Malformed
//! points are filtered, never fatal; the whole activity is rejected only
//! when fewer than two valid points remain.

use serde::{Deserialize, Serialize};
use shared::{RawStreamSet, TrackPoint};

/// Why a point, or the whole stream, was rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    LatitudeOutOfBounds { index: usize, lat: f64 },
    LongitudeOutOfBounds { index: usize, lon: f64 },
    /// Zero displacement and zero elapsed time against the previous point
    DuplicatePoint { index: usize },
    /// Elapsed time went backwards against the previous kept point
    OutOfOrderPoint { index: usize },
    MissingCoordinateStream,
    InsufficientData { valid_points: usize },
}

/// Result of validating one raw stream set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    pub clean: Vec<TrackPoint>,
    pub rejections: Vec<RejectionReason>,
}

impl ValidationOutcome {
    /// True when the whole activity was rejected
    pub fn is_insufficient(&self) -> bool {
        self.clean.is_empty()
    }

    /// Short human-readable summary of the rejections
    pub fn describe_rejections(&self) -> String {
        if self.rejections.is_empty() {
            return "no rejections".to_string();
        }
        let shown: Vec<String> = self
            .rejections
            .iter()
            .take(3)
            .map(|r| format!("{r:?}"))
            .collect();
        if self.rejections.len() > 3 {
            format!("{} (+{} more)", shown.join(", "), self.rejections.len() - 3)
        } else {
            shown.join(", ")
        }
    }
}

/// Validate a raw stream set into a clean, time-ordered track.
///
/// The side channels (altitude, velocity) ride along by index and are
/// optional per point; only `latlng` and `time` drive acceptance. A
/// missing `time` stream falls back to the point index, which preserves
/// ordering.
pub fn validate(streams: &RawStreamSet) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    let Some(latlng) = &streams.latlng else {
        outcome.rejections.push(RejectionReason::MissingCoordinateStream);
        outcome
            .rejections
            .push(RejectionReason::InsufficientData { valid_points: 0 });
        return outcome;
    };

    for (index, pair) in latlng.data.iter().enumerate() {
        let [lat, lon] = *pair;

        // NaN fails both range checks and is filtered here too
        if !(-90.0..=90.0).contains(&lat) {
            outcome
                .rejections
                .push(RejectionReason::LatitudeOutOfBounds { index, lat });
            continue;
        }
        if !(-180.0..=180.0).contains(&lon) {
            outcome
                .rejections
                .push(RejectionReason::LongitudeOutOfBounds { index, lon });
            continue;
        }

        let elapsed_s = streams
            .time
            .as_ref()
            .and_then(|t| t.data.get(index).copied())
            .unwrap_or(index as u32);

        if let Some(prev) = outcome.clean.last() {
            if prev.lat == lat && prev.lon == lon && prev.elapsed_s == elapsed_s {
                outcome
                    .rejections
                    .push(RejectionReason::DuplicatePoint { index });
                continue;
            }
            if elapsed_s < prev.elapsed_s {
                outcome
                    .rejections
                    .push(RejectionReason::OutOfOrderPoint { index });
                continue;
            }
        }

        outcome.clean.push(TrackPoint {
            lat,
            lon,
            elapsed_s,
            altitude_m: streams.altitude.as_ref().and_then(|a| a.data.get(index).copied()),
            velocity_ms: streams
                .velocity_smooth
                .as_ref()
                .and_then(|v| v.data.get(index).copied()),
        });
    }

    if outcome.clean.len() < 2 {
        outcome.rejections.push(RejectionReason::InsufficientData {
            valid_points: outcome.clean.len(),
        });
        outcome.clean.clear();
    }

    outcome
}
