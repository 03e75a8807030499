//! Location provider abstraction and the built-in simulated provider.
//!
//! The platform layer (mobile shell, test harness) implements
//! [`LocationProvider`]; the engine only consumes fixes through it. The
//! crate ships a scripted in-process provider for tests and the demo binary.

use crate::location::types::{LocationConfig, LocationError, LocationFix};
use crossbeam::channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Device location source consumed by the tracking engine.
pub trait LocationProvider: Send + Sync {
    /// Whether location services are enabled on the device.
    fn is_enabled(&self) -> bool;

    /// One-shot current position, used for the pre-session readiness check.
    fn current_position(&self) -> Result<LocationFix, LocationError>;

    /// Open a continuous fix stream with the given delivery parameters.
    fn subscribe(&self, config: &LocationConfig) -> Result<LocationSubscription, LocationError>;

    /// Request continued delivery while the app is not focused.
    ///
    /// The grant is released by dropping the returned guard.
    fn acquire_background(&self) -> Result<BackgroundGrant, LocationError>;
}

/// Handle to an open fix stream. Dropping it stops delivery.
pub struct LocationSubscription {
    receiver: Receiver<LocationFix>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl LocationSubscription {
    /// Wrap a fix channel with its cancellation action.
    pub fn new(receiver: Receiver<LocationFix>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Channel end the fixes arrive on. Disconnects once the stream stops.
    pub fn receiver(&self) -> Receiver<LocationFix> {
        self.receiver.clone()
    }

    /// Stop delivery. Idempotent.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Scoped background-execution grant. Dropping it releases the grant.
pub struct BackgroundGrant {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl BackgroundGrant {
    /// Wrap a platform grant with its release action.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A grant that needs no platform teardown.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the grant. Idempotent.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for BackgroundGrant {
    fn drop(&mut self) {
        self.release();
    }
}

/// Scripted provider that replays a fixed route on a timer thread.
///
/// Fixes are timestamped at emission, so replayed sessions look live to the
/// engine. Used by the demo binary and integration tests.
pub struct SimulatedLocationProvider {
    script: Vec<LocationFix>,
    emit_interval: Duration,
    enabled: bool,
}

impl SimulatedLocationProvider {
    /// Create a provider that will replay `script` at `emit_interval` pace.
    pub fn new(script: Vec<LocationFix>, emit_interval: Duration) -> Self {
        Self {
            script,
            emit_interval,
            enabled: true,
        }
    }

    /// Simulate a device with location services turned off.
    pub fn disabled() -> Self {
        Self {
            script: Vec::new(),
            emit_interval: Duration::from_secs(1),
            enabled: false,
        }
    }
}

impl LocationProvider for SimulatedLocationProvider {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn current_position(&self) -> Result<LocationFix, LocationError> {
        if !self.enabled {
            return Err(LocationError::ServicesDisabled);
        }

        self.script
            .first()
            .cloned()
            .map(|fix| LocationFix {
                timestamp: chrono::Utc::now(),
                ..fix
            })
            .ok_or_else(|| LocationError::Unavailable("empty route script".to_string()))
    }

    fn subscribe(&self, _config: &LocationConfig) -> Result<LocationSubscription, LocationError> {
        if !self.enabled {
            return Err(LocationError::ServicesDisabled);
        }

        let (tx, rx) = crossbeam::channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancelled.clone();
        let script = self.script.clone();
        let interval = self.emit_interval;

        std::thread::Builder::new()
            .name("sim-location".to_string())
            .spawn(move || {
                for fix in script {
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    std::thread::sleep(interval);
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    let stamped = LocationFix {
                        timestamp: chrono::Utc::now(),
                        ..fix
                    };
                    if tx.send(stamped).is_err() {
                        break;
                    }
                }
                // Sender drops here; the receiver disconnects.
            })
            .map_err(|e| LocationError::StreamFailed(e.to_string()))?;

        Ok(LocationSubscription::new(rx, move || {
            cancel_flag.store(true, Ordering::SeqCst);
        }))
    }

    fn acquire_background(&self) -> Result<BackgroundGrant, LocationError> {
        Ok(BackgroundGrant::noop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fix(lat: f64, lon: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: lon,
            altitude: Some(100.0),
            horizontal_accuracy: 5.0,
            timestamp: Utc::now(),
            speed: Some(3.0),
        }
    }

    #[test]
    fn test_disabled_provider_rejects() {
        let provider = SimulatedLocationProvider::disabled();
        assert!(!provider.is_enabled());
        assert!(matches!(
            provider.current_position(),
            Err(LocationError::ServicesDisabled)
        ));
        assert!(provider.subscribe(&LocationConfig::default()).is_err());
    }

    #[test]
    fn test_subscription_delivers_and_disconnects() {
        let provider = SimulatedLocationProvider::new(
            vec![fix(45.5, -122.5), fix(45.5001, -122.5)],
            Duration::from_millis(5),
        );

        let sub = provider.subscribe(&LocationConfig::default()).unwrap();
        let rx = sub.receiver();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!((first.latitude - 45.5).abs() < 1e-9);
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!((second.latitude - 45.5001).abs() < 1e-9);

        // Script exhausted: the sender side drops and the channel closes.
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_subscription_stop_halts_stream() {
        let provider = SimulatedLocationProvider::new(
            vec![fix(45.5, -122.5); 1000],
            Duration::from_millis(20),
        );

        let mut sub = provider.subscribe(&LocationConfig::default()).unwrap();
        let rx = sub.receiver();
        let _ = rx.recv_timeout(Duration::from_secs(1)).unwrap();

        sub.stop();
        sub.stop(); // idempotent

        // After cancellation the emitter exits and the channel disconnects.
        loop {
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(_) => continue,
                Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
                Err(e) => panic!("stream did not disconnect: {e}"),
            }
        }
    }
}
