//! Location fix and signal quality types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single GPS fix as delivered by the device location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude above sea level in meters, when the provider reports one
    pub altitude: Option<f64>,
    /// Estimated horizontal accuracy radius in meters
    pub horizontal_accuracy: f64,
    /// Provider timestamp of the fix
    pub timestamp: DateTime<Utc>,
    /// Provider-reported ground speed in m/s, when available
    pub speed: Option<f64>,
}

/// Discrete GPS signal quality tier, ordered from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum GpsQuality {
    /// No usable signal
    #[default]
    #[serde(rename = "none")]
    NoSignal,
    /// Accuracy worse than 20 m but within 50 m
    Poor,
    /// Accuracy within 20 m
    Fair,
    /// Accuracy within 10 m
    Good,
    /// Accuracy within 5 m
    Excellent,
}

impl std::fmt::Display for GpsQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpsQuality::NoSignal => write!(f, "No Signal"),
            GpsQuality::Poor => write!(f, "Poor"),
            GpsQuality::Fair => write!(f, "Fair"),
            GpsQuality::Good => write!(f, "Good"),
            GpsQuality::Excellent => write!(f, "Excellent"),
        }
    }
}

/// Most recent signal reading: raw accuracy plus its classified tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSignal {
    /// Horizontal accuracy in meters
    pub accuracy: f64,
    /// Classified quality tier
    pub quality: GpsQuality,
}

/// Subscription parameters passed to the location provider.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// Minimum movement between delivered fixes in meters (0 = every fix)
    pub min_distance_m: f64,
    /// Minimum interval between delivered fixes in milliseconds
    pub min_interval_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 0.0,
            min_interval_ms: 1000,
        }
    }
}

/// Errors from the device location provider.
#[derive(Debug, Error)]
pub enum LocationError {
    /// Location services are turned off on the device
    #[error("location services are disabled")]
    ServicesDisabled,

    /// The user denied location permission
    #[error("location permission denied")]
    PermissionDenied,

    /// No position could be produced
    #[error("location unavailable: {0}")]
    Unavailable(String),

    /// The continuous fix stream could not be started
    #[error("failed to start location stream: {0}")]
    StreamFailed(String),
}
