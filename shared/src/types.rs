//! Core types for the activity acquisition system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a remote HTTP response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 429 - remote signaled rate limiting
    Throttled,
    /// 5xx - remote-side or network trouble, worth retrying
    Transient,
    /// Other 4xx - the request itself is bad, retrying cannot help
    Permanent,
}

impl StatusClass {
    /// Classify a raw HTTP status code
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=299 => StatusClass::Success,
            429 => StatusClass::Throttled,
            500..=599 => StatusClass::Transient,
            _ => StatusClass::Permanent,
        }
    }
}

/// Failure reported by the remote transport for a single request attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportFailure {
    /// Remote answered 429
    RateLimitExceeded,
    /// Connection-level failure (DNS, timeout, reset)
    NetworkError(String),
    /// Remote answered 5xx
    ServerError(u16),
    /// Remote answered a non-throttling 4xx
    RequestRejected(u16),
    /// Body arrived but could not be parsed as JSON
    MalformedPayload(String),
}

impl TransportFailure {
    /// Map this failure onto the retry-policy error classes
    pub fn class(&self) -> ErrorClass {
        match self {
            TransportFailure::RateLimitExceeded => ErrorClass::Throttled,
            TransportFailure::NetworkError(_) | TransportFailure::ServerError(_) => ErrorClass::Transient,
            TransportFailure::RequestRejected(_) | TransportFailure::MalformedPayload(_) => {
                ErrorClass::Permanent
            }
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::RateLimitExceeded => write!(f, "rate limit exceeded"),
            TransportFailure::NetworkError(msg) => write!(f, "network error: {msg}"),
            TransportFailure::ServerError(code) => write!(f, "server error: HTTP {code}"),
            TransportFailure::RequestRejected(code) => write!(f, "request rejected: HTTP {code}"),
            TransportFailure::MalformedPayload(msg) => write!(f, "malformed payload: {msg}"),
        }
    }
}

/// Error classes the retry policy decides over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    Throttled,
    Transient,
    Permanent,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Throttled => write!(f, "throttled"),
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Permanent => write!(f, "permanent"),
        }
    }
}

/// One validated point of a GPS track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Seconds since activity start
    pub elapsed_s: u32,
    /// Meters above sea level, when the altitude stream was present
    pub altitude_m: Option<f64>,
    /// Smoothed speed in m/s, when the velocity stream was present
    pub velocity_ms: Option<f64>,
}

/// The validated unit handed to downstream consumers.
///
/// Invariant: every point lies within valid latitude/longitude bounds and
/// the track is ordered by elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    /// Total distance in meters
    pub distance_m: f64,
    /// Moving time in seconds
    pub moving_time_s: u32,
    pub track: Vec<TrackPoint>,
}

/// Activity summary as returned by `/athlete/activities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: DateTime<Utc>,
    /// Meters
    #[serde(default)]
    pub distance: f64,
    /// Seconds
    #[serde(default)]
    pub moving_time: u32,
    #[serde(default)]
    pub map: Option<ActivityMap>,
}

impl SummaryActivity {
    /// Whether this activity is a ride carrying enough map data to render
    pub fn is_mappable_ride(&self) -> bool {
        matches!(self.activity_type.as_str(), "Ride" | "VirtualRide")
            && self
                .map
                .as_ref()
                .and_then(|m| m.summary_polyline.as_deref())
                .map(|p| !p.is_empty())
                .unwrap_or(false)
    }
}

/// Map block embedded in an activity summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    #[serde(default)]
    pub summary_polyline: Option<String>,
}

/// One stream from `/activities/{id}/streams?key_by_type=true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStream<T> {
    pub data: Vec<T>,
}

/// Parallel raw streams for a single activity, keyed by type.
///
/// Side channels (altitude, velocity) are frequently absent or shorter than
/// the coordinate stream; only `latlng` and `time` drive validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStreamSet {
    #[serde(default)]
    pub latlng: Option<RawStream<[f64; 2]>>,
    #[serde(default)]
    pub altitude: Option<RawStream<f64>>,
    #[serde(default)]
    pub velocity_smooth: Option<RawStream<f64>>,
    #[serde(default)]
    pub time: Option<RawStream<u32>>,
}
