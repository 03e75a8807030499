//! Horizontal-accuracy classification into signal quality tiers.

use crate::location::types::{GpsQuality, GpsSignal};

/// Accuracy bound for an excellent signal, in meters.
pub const EXCELLENT_ACCURACY_M: f64 = 5.0;
/// Accuracy bound for a good signal, in meters.
pub const GOOD_ACCURACY_M: f64 = 10.0;
/// Accuracy bound for a fair signal, in meters.
pub const FAIR_ACCURACY_M: f64 = 20.0;
/// Accuracy bound for a poor signal, in meters. Anything worse is unusable.
pub const POOR_ACCURACY_M: f64 = 50.0;

/// Classify a horizontal accuracy radius into a quality tier.
pub fn classify_accuracy(accuracy_m: f64) -> GpsQuality {
    if accuracy_m <= EXCELLENT_ACCURACY_M {
        GpsQuality::Excellent
    } else if accuracy_m <= GOOD_ACCURACY_M {
        GpsQuality::Good
    } else if accuracy_m <= FAIR_ACCURACY_M {
        GpsQuality::Fair
    } else if accuracy_m <= POOR_ACCURACY_M {
        GpsQuality::Poor
    } else {
        GpsQuality::NoSignal
    }
}

impl GpsSignal {
    /// Build a signal reading from a raw accuracy value.
    pub fn from_accuracy(accuracy_m: f64) -> Self {
        Self {
            accuracy: accuracy_m,
            quality: classify_accuracy(accuracy_m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify_accuracy(3.0), GpsQuality::Excellent);
        assert_eq!(classify_accuracy(5.0), GpsQuality::Excellent);
        assert_eq!(classify_accuracy(5.1), GpsQuality::Good);
        assert_eq!(classify_accuracy(10.0), GpsQuality::Good);
        assert_eq!(classify_accuracy(15.0), GpsQuality::Fair);
        assert_eq!(classify_accuracy(20.0), GpsQuality::Fair);
        assert_eq!(classify_accuracy(35.0), GpsQuality::Poor);
        assert_eq!(classify_accuracy(50.0), GpsQuality::Poor);
        assert_eq!(classify_accuracy(50.1), GpsQuality::NoSignal);
        assert_eq!(classify_accuracy(500.0), GpsQuality::NoSignal);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(GpsQuality::Excellent > GpsQuality::Good);
        assert!(GpsQuality::Good > GpsQuality::Fair);
        assert!(GpsQuality::Fair > GpsQuality::Poor);
        assert!(GpsQuality::Poor > GpsQuality::NoSignal);
    }

    #[test]
    fn test_signal_from_accuracy() {
        let signal = GpsSignal::from_accuracy(8.0);
        assert_eq!(signal.accuracy, 8.0);
        assert_eq!(signal.quality, GpsQuality::Good);
    }
}
