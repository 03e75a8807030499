//! Stillness detection with dual-threshold hysteresis.
//!
//! The pause and resume thresholds differ on purpose: a single threshold
//! oscillates when the athlete hovers near the boundary. Detection runs on
//! instantaneous speed, not the smoothed window, so a genuine stop is seen
//! within the dwell time rather than after the window drains.

use chrono::{DateTime, Utc};

/// Speed below which the session is considered stopped, in m/s.
pub const PAUSE_SPEED_MPS: f64 = 0.8;
/// Speed above which an auto-paused session resumes, in m/s.
pub const RESUME_SPEED_MPS: f64 = 1.2;
/// How long speed must stay below the pause threshold, in seconds.
pub const PAUSE_DWELL_SECS: f64 = 5.0;

/// Transition requested by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPauseEvent {
    /// Speed has been below the pause threshold for the full dwell time.
    Pause,
    /// Speed crossed the resume threshold while auto-paused.
    Resume,
}

/// Hysteresis state over recent instantaneous speed samples.
#[derive(Debug, Default)]
pub struct AutoPauseDetector {
    below_since: Option<DateTime<Utc>>,
}

impl AutoPauseDetector {
    /// Create a detector with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one speed sample. `auto_paused` tells the detector which side of
    /// the hysteresis it is evaluating.
    pub fn update(
        &mut self,
        speed_mps: f64,
        at: DateTime<Utc>,
        auto_paused: bool,
    ) -> Option<AutoPauseEvent> {
        if auto_paused {
            if speed_mps > RESUME_SPEED_MPS {
                self.below_since = None;
                return Some(AutoPauseEvent::Resume);
            }
            return None;
        }

        if speed_mps < PAUSE_SPEED_MPS {
            let since = *self.below_since.get_or_insert(at);
            let dwell = (at - since).num_milliseconds() as f64 / 1000.0;
            if dwell > PAUSE_DWELL_SECS {
                self.below_since = None;
                return Some(AutoPauseEvent::Pause);
            }
        } else {
            self.below_since = None;
        }

        None
    }

    /// Drop any accumulated dwell, e.g. on manual pause or session reset.
    pub fn reset(&mut self) {
        self.below_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_pause_requires_dwell() {
        let mut detector = AutoPauseDetector::new();
        assert_eq!(detector.update(0.3, t(0), false), None);
        assert_eq!(detector.update(0.3, t(3), false), None);
        // Exactly at the dwell bound: not yet longer than the threshold.
        assert_eq!(detector.update(0.3, t(5), false), None);
        assert_eq!(
            detector.update(0.3, t(6), false),
            Some(AutoPauseEvent::Pause)
        );
    }

    #[test]
    fn test_movement_resets_dwell() {
        let mut detector = AutoPauseDetector::new();
        assert_eq!(detector.update(0.3, t(0), false), None);
        assert_eq!(detector.update(2.0, t(3), false), None);
        // Dwell restarted: a further 4 s below is not enough.
        assert_eq!(detector.update(0.3, t(4), false), None);
        assert_eq!(detector.update(0.3, t(8), false), None);
        assert_eq!(
            detector.update(0.3, t(10), false),
            Some(AutoPauseEvent::Pause)
        );
    }

    #[test]
    fn test_resume_needs_higher_threshold() {
        let mut detector = AutoPauseDetector::new();
        // 0.9 m/s clears the pause threshold but not the resume one.
        assert_eq!(detector.update(0.9, t(0), true), None);
        assert_eq!(detector.update(1.2, t(1), true), None);
        assert_eq!(
            detector.update(1.3, t(2), true),
            Some(AutoPauseEvent::Resume)
        );
    }

    #[test]
    fn test_no_flapping_between_thresholds() {
        let mut detector = AutoPauseDetector::new();
        // Hovering at 1.0 m/s: too fast to pause, too slow to resume.
        for s in 0..20 {
            assert_eq!(detector.update(1.0, t(s), false), None);
        }
        for s in 20..40 {
            assert_eq!(detector.update(1.0, t(s), true), None);
        }
    }
}
