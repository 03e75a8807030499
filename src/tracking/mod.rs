//! Live GPS tracking: the session state machine and its processing units.

pub mod autopause;
pub mod clock;
pub mod engine;
pub mod filters;
pub mod hub;
pub mod resources;
pub mod segments;
pub mod types;

pub use engine::TrackingEngine;
pub use hub::{SubscriptionHub, SubscriptionToken};
pub use segments::{SegmentAlert, SegmentAlertFn, SegmentMetrics, SegmentTarget, SegmentTrackingState};
pub use types::{
    DataSource, SplitMetrics, SportType, TrackedWorkoutMetrics, TrackerConfig, TrackingError,
    TrackingState, TrackingStatus,
};
