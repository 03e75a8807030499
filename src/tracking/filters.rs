//! Noise rejection and smoothing for the raw fix stream.
//!
//! Three gates run in order on every fix: the accuracy gate (wildly
//! inaccurate fixes update the signal annotation only), the jitter gate
//! (sub-threshold movement is discarded entirely), and the elevation noise
//! gate (altitude deltas below the threshold are ignored, since GPS altitude
//! noise is much larger than horizontal noise).

use crate::geo::haversine_distance;
use crate::location::types::LocationFix;
use std::collections::VecDeque;

/// Fixes with accuracy worse than this never affect distance or pace.
pub const MAX_ACCURACY_M: f64 = 50.0;
/// Movement below this is treated as GPS jitter.
pub const MIN_DISTANCE_M: f64 = 2.0;
/// Number of recent speed samples in the smoothing window.
pub const SPEED_WINDOW: usize = 10;
/// Below this smoothed speed no current pace is derived.
pub const MIN_SPEED_FOR_PACE_MPS: f64 = 0.1;
/// Altitude deltas smaller than this are ignored.
pub const ELEVATION_NOISE_M: f64 = 3.0;

/// Bounded ring of recent instantaneous speeds, smoothed by mean.
#[derive(Debug)]
pub struct SpeedSmoother {
    buffer: VecDeque<f64>,
    window_size: usize,
    sum: f64,
}

impl SpeedSmoother {
    /// Create a smoother over the given window size.
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    /// Push a speed sample and return the new smoothed value.
    pub fn add(&mut self, speed_mps: f64) -> f64 {
        self.buffer.push_back(speed_mps);
        self.sum += speed_mps;

        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old;
            }
        }

        self.sum / self.buffer.len() as f64
    }

    /// Current smoothed speed, if any sample has been pushed.
    pub fn smoothed(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.sum / self.buffer.len() as f64)
        }
    }

    /// Clear all samples.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }
}

/// Altitude-change filter over the last accepted altitude.
///
/// The baseline only advances when a delta clears the noise threshold, so
/// slow drift below the threshold never accumulates.
#[derive(Debug, Default)]
pub struct ElevationFilter {
    baseline: Option<f64>,
}

/// Gain/loss produced by one accepted altitude sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElevationDelta {
    pub gain_m: f64,
    pub loss_m: f64,
}

impl ElevationFilter {
    /// Feed an altitude sample; returns accumulated gain/loss, if any.
    pub fn apply(&mut self, altitude: Option<f64>) -> ElevationDelta {
        let Some(altitude) = altitude else {
            return ElevationDelta::default();
        };

        let Some(baseline) = self.baseline else {
            self.baseline = Some(altitude);
            return ElevationDelta::default();
        };

        let delta = altitude - baseline;
        if delta.abs() < ELEVATION_NOISE_M {
            return ElevationDelta::default();
        }

        self.baseline = Some(altitude);
        if delta > 0.0 {
            ElevationDelta {
                gain_m: delta,
                loss_m: 0.0,
            }
        } else {
            ElevationDelta {
                gain_m: 0.0,
                loss_m: -delta,
            }
        }
    }

    /// Forget the baseline.
    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

/// Result of running one fix through the filter pipeline.
#[derive(Debug)]
pub enum FixOutcome {
    /// Accuracy above the gate; only the signal annotation may change.
    Rejected,
    /// First usable fix of the session; establishes the distance reference.
    First,
    /// Sub-threshold movement; nothing accumulates, but the instantaneous
    /// speed is still reported for the stillness detector.
    Jitter {
        /// Distance from the reference divided by elapsed time
        raw_speed_mps: f64,
    },
    /// Fix accepted; carries everything the state record accumulates.
    Accepted(AcceptedFix),
}

/// Accumulation payload of an accepted fix.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedFix {
    /// Great-circle distance from the previous accepted fix, in meters
    pub distance_delta_m: f64,
    /// Instantaneous speed over that hop, in m/s
    pub raw_speed_mps: f64,
    /// Mean of the recent-speed window after this sample, in m/s
    pub smoothed_speed_mps: f64,
    /// Filtered elevation gain from this fix, in meters
    pub elevation_gain_m: f64,
    /// Filtered elevation loss from this fix, in meters
    pub elevation_loss_m: f64,
}

/// Stateful per-session filter pipeline.
#[derive(Debug)]
pub struct LocationFilter {
    reference: Option<LocationFix>,
    smoother: SpeedSmoother,
    elevation: ElevationFilter,
}

impl LocationFilter {
    /// Create a fresh pipeline for a new session.
    pub fn new() -> Self {
        Self {
            reference: None,
            smoother: SpeedSmoother::new(SPEED_WINDOW),
            elevation: ElevationFilter::default(),
        }
    }

    /// Run a fix through the gates while the session is moving.
    pub fn process(&mut self, fix: &LocationFix) -> FixOutcome {
        if fix.horizontal_accuracy > MAX_ACCURACY_M {
            return FixOutcome::Rejected;
        }

        let Some(reference) = &self.reference else {
            self.reference = Some(fix.clone());
            self.elevation.apply(fix.altitude);
            return FixOutcome::First;
        };

        let dt_secs =
            (fix.timestamp - reference.timestamp).num_milliseconds() as f64 / 1000.0;
        if dt_secs <= 0.0 {
            // Out-of-order or duplicate timestamp; nothing to measure against.
            return FixOutcome::Rejected;
        }

        let distance = haversine_distance(
            reference.latitude,
            reference.longitude,
            fix.latitude,
            fix.longitude,
        );
        let raw_speed = distance / dt_secs;

        if distance < MIN_DISTANCE_M {
            return FixOutcome::Jitter {
                raw_speed_mps: raw_speed,
            };
        }

        let smoothed = self.smoother.add(raw_speed);
        let elevation = self.elevation.apply(fix.altitude);
        self.reference = Some(fix.clone());

        FixOutcome::Accepted(AcceptedFix {
            distance_delta_m: distance,
            raw_speed_mps: raw_speed,
            smoothed_speed_mps: smoothed,
            elevation_gain_m: elevation.gain_m,
            elevation_loss_m: elevation.loss_m,
        })
    }

    /// Observe a fix while paused: keeps the distance reference fresh and
    /// reports instantaneous speed for auto-resume, accumulating nothing.
    pub fn observe(&mut self, fix: &LocationFix) -> Option<f64> {
        if fix.horizontal_accuracy > MAX_ACCURACY_M {
            return None;
        }

        let speed = self.reference.as_ref().and_then(|reference| {
            let dt_secs =
                (fix.timestamp - reference.timestamp).num_milliseconds() as f64 / 1000.0;
            if dt_secs <= 0.0 {
                return None;
            }
            let distance = haversine_distance(
                reference.latitude,
                reference.longitude,
                fix.latitude,
                fix.longitude,
            );
            Some(distance / dt_secs)
        });

        self.reference = Some(fix.clone());
        speed.or(fix.speed)
    }

    /// Smoothed speed of the current window.
    pub fn smoothed_speed(&self) -> Option<f64> {
        self.smoother.smoothed()
    }

    /// Reset all per-session state.
    pub fn reset(&mut self) {
        self.reference = None;
        self.smoother.reset();
        self.elevation.reset();
    }
}

impl Default for LocationFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a pace in seconds per kilometer from a speed in m/s, when the
/// speed is high enough for the pace to be meaningful.
pub fn pace_from_speed(speed_mps: f64) -> Option<f64> {
    if speed_mps > MIN_SPEED_FOR_PACE_MPS {
        Some(1000.0 / speed_mps)
    } else {
        None
    }
}
