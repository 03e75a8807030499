//! Core tracking types: session lifecycle states, the canonical live state
//! record, the completion artifact, and engine errors.

use crate::location::types::{GpsSignal, LocationConfig, LocationError, LocationFix};
use crate::tracking::segments::{SegmentMetrics, SegmentTrackingState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of the tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// No session
    #[default]
    Idle,
    /// Pre-start countdown shown by the UI
    Countdown,
    /// Actively tracking
    Tracking,
    /// Manually paused
    Paused,
    /// Paused automatically by the stillness detector
    AutoPaused,
    /// Between structured segments, counting down to the next one
    SegmentTransition,
    /// Finalizing metrics
    Stopping,
    /// Session complete, awaiting acknowledgement
    Summary,
}

impl TrackingStatus {
    /// Whether a session currently owns the engine (anything between start
    /// and stop/discard).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TrackingStatus::Tracking
                | TrackingStatus::Paused
                | TrackingStatus::AutoPaused
                | TrackingStatus::SegmentTransition
        )
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingStatus::Idle => write!(f, "Idle"),
            TrackingStatus::Countdown => write!(f, "Countdown"),
            TrackingStatus::Tracking => write!(f, "Tracking"),
            TrackingStatus::Paused => write!(f, "Paused"),
            TrackingStatus::AutoPaused => write!(f, "Auto-Paused"),
            TrackingStatus::SegmentTransition => write!(f, "Segment Transition"),
            TrackingStatus::Stopping => write!(f, "Stopping"),
            TrackingStatus::Summary => write!(f, "Summary"),
        }
    }
}

/// Sport being tracked; selects the MET value for calorie estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportType {
    Running,
    Walking,
    Hiking,
    Cycling,
    Other,
}

impl std::fmt::Display for SportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SportType::Running => write!(f, "Running"),
            SportType::Walking => write!(f, "Walking"),
            SportType::Hiking => write!(f, "Hiking"),
            SportType::Cycling => write!(f, "Cycling"),
            SportType::Other => write!(f, "Other"),
        }
    }
}

/// How a workout record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Recorded by this engine from a live GPS stream
    LiveTracking,
    /// Ingested from an external health platform
    HealthImport,
}

/// The canonical, single-writer live session record.
///
/// Accumulators (`elapsed_seconds`, `total_paused_seconds`, `distance_meters`,
/// elevation gain/loss) are monotonically non-decreasing for the lifetime of
/// a session. Pace and speed fields are derived from the accumulators on
/// every update and are `None` until enough speed data exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingState {
    /// Lifecycle state
    pub status: TrackingStatus,
    /// Identity of the in-progress session; set at start
    pub session_id: Option<String>,
    /// Sport of the in-progress session
    pub sport_type: Option<SportType>,
    /// Structured-interval sub-state; `None` for free-form sessions
    pub segments: Option<SegmentTrackingState>,
    /// Session start timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Set while paused or auto-paused, cleared on resume
    pub paused_at: Option<DateTime<Utc>>,
    /// Moving time in seconds
    pub elapsed_seconds: u32,
    /// Paused time accumulated across all pause/resume cycles
    pub total_paused_seconds: u32,
    /// Accumulated distance in meters
    pub distance_meters: f64,
    /// Accumulated elevation gain in meters
    pub elevation_gain_meters: f64,
    /// Accumulated elevation loss in meters
    pub elevation_loss_meters: f64,
    /// Smoothed current pace in seconds per kilometer
    pub current_pace_secs_per_km: Option<f64>,
    /// Whole-session average pace in seconds per kilometer
    pub average_pace_secs_per_km: Option<f64>,
    /// Whole-session average speed in km/h
    pub average_speed_kmh: Option<f64>,
    /// Most recent signal reading
    pub gps_signal: Option<GpsSignal>,
    /// Most recent fix delivered by the provider
    pub last_location: Option<LocationFix>,
    /// Last fatal condition, if any
    pub error: Option<String>,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            status: TrackingStatus::Idle,
            session_id: None,
            sport_type: None,
            segments: None,
            started_at: None,
            paused_at: None,
            elapsed_seconds: 0,
            total_paused_seconds: 0,
            distance_meters: 0.0,
            elevation_gain_meters: 0.0,
            elevation_loss_meters: 0.0,
            current_pace_secs_per_km: None,
            average_pace_secs_per_km: None,
            average_speed_kmh: None,
            gps_signal: None,
            last_location: None,
            error: None,
        }
    }
}

/// One automatically recorded kilometer split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    /// 1-based kilometer number
    pub kilometer: u32,
    /// Moving time spent in this kilometer, in seconds
    pub duration_seconds: u32,
    /// Pace for this kilometer in seconds per kilometer
    pub pace_secs_per_km: f64,
}

/// Immutable summary produced by `stop_tracking`, handed to the persistence
/// collaborator. The engine never writes storage itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedWorkoutMetrics {
    /// Session identity
    pub session_id: String,
    /// Sport of the session
    pub sport_type: SportType,
    /// Moving time in seconds
    pub duration_seconds: u32,
    /// Paused time in seconds
    pub total_paused_seconds: u32,
    /// Total distance in meters
    pub distance_meters: f64,
    /// Average pace in seconds per kilometer
    pub average_pace_secs_per_km: Option<f64>,
    /// Average speed in km/h
    pub average_speed_kmh: Option<f64>,
    /// Elevation gain in meters
    pub elevation_gain_meters: f64,
    /// Elevation loss in meters
    pub elevation_loss_meters: f64,
    /// MET-based calorie estimate
    pub calories: u32,
    /// How this record was produced
    pub data_source: DataSource,
    /// Session start timestamp
    pub started_at: DateTime<Utc>,
    /// Session completion timestamp
    pub completed_at: DateTime<Utc>,
    /// Automatic kilometer splits
    pub splits: Vec<SplitMetrics>,
    /// Per-segment results for structured workouts
    pub segments: Option<Vec<SegmentMetrics>>,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Athlete weight for calorie estimation, in kilograms
    pub weight_kg: f64,
    /// Whether the stillness detector may pause the session
    pub auto_pause_enabled: bool,
    /// Delivery parameters requested from the location provider
    pub location: LocationConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            auto_pause_enabled: true,
            location: LocationConfig::default(),
        }
    }
}

/// Errors from tracking session operations.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A different session already owns the engine
    #[error("session already active: {0}")]
    SessionAlreadyActive(String),

    /// The operation needs an active session and there is none
    #[error("no active session")]
    NoActiveSession,

    /// The operation is not legal from the current lifecycle state
    #[error("illegal transition from {from}")]
    InvalidTransition {
        /// State the engine was in when the operation was attempted
        from: TrackingStatus,
    },

    /// Segment operation on a free-form session
    #[error("session has no segment plan")]
    NoSegmentPlan,

    /// Provider-side failure
    #[error("location error: {0}")]
    Location(#[from] LocationError),
}
