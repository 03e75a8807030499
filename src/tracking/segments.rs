//! Structured-workout segment tracking: per-interval actuals, target
//! evaluation, approach alerts, and the inter-segment transition countdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds counted down between auto-advanced segments.
pub const TRANSITION_COUNTDOWN_SECS: u8 = 3;
/// Lead time for the approach alert on duration targets, in seconds.
pub const APPROACH_LEAD_SECS: u32 = 10;
/// Fraction of a distance target at which the approach alert arms.
pub const APPROACH_DISTANCE_FRACTION: f64 = 0.10;
/// Upper bound on the distance approach lead, in meters.
pub const APPROACH_DISTANCE_CAP_M: f64 = 100.0;

/// What a segment is trying to achieve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentTarget {
    /// Run for a fixed time
    Time {
        /// Target duration in seconds
        seconds: u32,
    },
    /// Cover a fixed distance
    Distance {
        /// Target distance in meters
        meters: f64,
    },
    /// No target; advances only on manual skip
    Open,
}

impl SegmentTarget {
    /// Duration target helper.
    pub fn time(seconds: u32) -> Self {
        SegmentTarget::Time { seconds }
    }

    /// Distance target helper.
    pub fn distance(meters: f64) -> Self {
        SegmentTarget::Distance { meters }
    }
}

/// Alerts raised while tracking a structured workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAlert {
    /// The current segment is close to its target (fires once per segment)
    Approaching { segment_index: usize },
    /// A segment reached its target and was completed
    Completed { segment_index: usize },
    /// The tracker moved on to a new segment
    Advanced { segment_index: usize },
    /// The last planned segment completed; the session continues free-form
    PlanCompleted,
}

/// Callback invoked with each [`SegmentAlert`].
pub type SegmentAlertFn = Box<dyn Fn(SegmentAlert) + Send>;

/// Target and actuals for one segment of a structured workout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetrics {
    /// What this segment is trying to achieve
    pub target: SegmentTarget,
    /// Accumulated moving time in this segment, in seconds
    pub actual_duration_seconds: u32,
    /// Accumulated distance in this segment, in meters
    pub actual_distance_meters: f64,
    /// When this segment became current
    pub started_at: Option<DateTime<Utc>>,
    /// When this segment completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Average pace over the segment, when both actuals are positive
    pub average_pace_secs_per_km: Option<f64>,
    #[serde(skip)]
    approach_alerted: bool,
}

impl SegmentMetrics {
    /// Fresh metrics for a planned segment.
    pub fn new(target: SegmentTarget) -> Self {
        Self {
            target,
            actual_duration_seconds: 0,
            actual_distance_meters: 0.0,
            started_at: None,
            completed_at: None,
            average_pace_secs_per_km: None,
            approach_alerted: false,
        }
    }

    /// Whether the actuals have reached the target.
    pub fn target_met(&self) -> bool {
        match self.target {
            SegmentTarget::Time { seconds } => self.actual_duration_seconds >= seconds,
            SegmentTarget::Distance { meters } => self.actual_distance_meters >= meters,
            SegmentTarget::Open => false,
        }
    }

    /// Whether the actuals are within the approach lead of the target.
    fn approaching(&self) -> bool {
        match self.target {
            SegmentTarget::Time { seconds } => {
                let remaining = seconds.saturating_sub(self.actual_duration_seconds);
                remaining > 0 && remaining <= APPROACH_LEAD_SECS
            }
            SegmentTarget::Distance { meters } => {
                let lead = (meters * APPROACH_DISTANCE_FRACTION).min(APPROACH_DISTANCE_CAP_M);
                let remaining = meters - self.actual_distance_meters;
                remaining > 0.0 && remaining <= lead
            }
            SegmentTarget::Open => false,
        }
    }

    fn complete(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        if self.actual_duration_seconds > 0 && self.actual_distance_meters > 0.0 {
            self.average_pace_secs_per_km = Some(
                self.actual_duration_seconds as f64 / (self.actual_distance_meters / 1000.0),
            );
        }
    }
}

/// Live state of a structured workout: the ordered segments, the cursor, and
/// the transition countdown.
///
/// `current_index` only increases; once it passes the last segment the plan
/// is finished and the session continues free-form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTrackingState {
    /// Ordered per-segment metrics
    pub segments: Vec<SegmentMetrics>,
    /// Index of the segment currently accumulating
    pub current_index: usize,
    /// Whether met targets advance automatically
    pub auto_advance: bool,
    /// Remaining seconds of the inter-segment countdown, when one is running
    pub transition_countdown: Option<u8>,
}

impl SegmentTrackingState {
    /// Build tracking state for a plan, marking the first segment started.
    pub fn new(targets: Vec<SegmentTarget>, started_at: DateTime<Utc>) -> Self {
        let mut segments: Vec<SegmentMetrics> =
            targets.into_iter().map(SegmentMetrics::new).collect();
        if let Some(first) = segments.first_mut() {
            first.started_at = Some(started_at);
        }
        Self {
            segments,
            current_index: 0,
            auto_advance: true,
            transition_countdown: None,
        }
    }

    /// The segment currently accumulating, if the plan is not finished.
    pub fn current(&self) -> Option<&SegmentMetrics> {
        self.segments.get(self.current_index)
    }

    /// Whether the inter-segment countdown is running.
    pub fn in_transition(&self) -> bool {
        self.transition_countdown.is_some()
    }

    /// Whether every planned segment has completed.
    pub fn plan_finished(&self) -> bool {
        self.current_index >= self.segments.len()
    }

    /// One second of moving time for the current segment.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        if self.in_transition() || self.plan_finished() {
            return Vec::new();
        }
        self.segments[self.current_index].actual_duration_seconds += 1;
        self.evaluate(now)
    }

    /// Accumulated distance routed to the current segment.
    pub fn add_distance(&mut self, meters: f64, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        if self.in_transition() || self.plan_finished() {
            return Vec::new();
        }
        self.segments[self.current_index].actual_distance_meters += meters;
        self.evaluate(now)
    }

    /// One second of the transition countdown.
    pub fn on_countdown_tick(&mut self, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        let Some(remaining) = self.transition_countdown else {
            return Vec::new();
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.transition_countdown = None;
            self.advance(now)
        } else {
            self.transition_countdown = Some(remaining);
            Vec::new()
        }
    }

    /// Complete the current segment now and advance without a countdown.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        if self.plan_finished() {
            return Vec::new();
        }

        // Skipping during the countdown just cuts it short.
        if self.in_transition() {
            self.transition_countdown = None;
            return self.advance(now);
        }

        let index = self.current_index;
        self.segments[index].complete(now);
        let mut alerts = vec![SegmentAlert::Completed {
            segment_index: index,
        }];
        alerts.extend(self.advance(now));
        alerts
    }

    /// Approach/target evaluation for the current segment.
    ///
    /// The approach alert is a level-crossing check: it fires the first time
    /// the actuals move inside the lead window, however they got there, so a
    /// missed tick cannot swallow it.
    fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        let index = self.current_index;
        let mut alerts = Vec::new();

        let segment = &mut self.segments[index];
        if !segment.approach_alerted && !segment.target_met() && segment.approaching() {
            segment.approach_alerted = true;
            alerts.push(SegmentAlert::Approaching {
                segment_index: index,
            });
        }

        if segment.target_met() && self.auto_advance {
            self.segments[index].complete(now);
            alerts.push(SegmentAlert::Completed {
                segment_index: index,
            });

            if index + 1 < self.segments.len() {
                self.transition_countdown = Some(TRANSITION_COUNTDOWN_SECS);
            } else {
                // Last planned segment: no transition, free-form from here.
                self.current_index = self.segments.len();
                alerts.push(SegmentAlert::PlanCompleted);
            }
        }

        alerts
    }

    fn advance(&mut self, now: DateTime<Utc>) -> Vec<SegmentAlert> {
        self.current_index += 1;
        if self.current_index < self.segments.len() {
            self.segments[self.current_index].started_at = Some(now);
            vec![SegmentAlert::Advanced {
                segment_index: self.current_index,
            }]
        } else {
            vec![SegmentAlert::PlanCompleted]
        }
    }
}
