//! OpenStride - Live GPS Workout Tracking Engine
//!
//! The real-time core of an outdoor fitness application: turns a stream of
//! noisy, irregularly-timed GPS fixes into a consistent workout record with
//! distance, pace, elevation, auto-pause, and structured-interval progress,
//! behind a strict session lifecycle state machine. Persistence, rendering,
//! and the device location provider live outside this crate.

pub mod geo;
pub mod location;
pub mod metrics;
pub mod tracking;

// Re-export commonly used types
pub use location::provider::{LocationProvider, SimulatedLocationProvider};
pub use location::types::{GpsQuality, GpsSignal, LocationConfig, LocationError, LocationFix};
pub use tracking::engine::TrackingEngine;
pub use tracking::segments::{SegmentAlert, SegmentTarget};
pub use tracking::types::{
    SportType, TrackedWorkoutMetrics, TrackerConfig, TrackingError, TrackingState, TrackingStatus,
};
