//! Session-scoped resource ownership: the location stream, the background
//! execution grant, and the worker draining fixes into the engine.
//!
//! Acquisition and release are symmetric. Release is idempotent and never
//! propagates failures; a broken platform teardown must not stop the user
//! from ending a workout.

use crate::location::provider::{BackgroundGrant, LocationProvider, LocationSubscription};
use crate::location::types::{LocationConfig, LocationError, LocationFix};

/// Event delivered to the engine by the drain worker.
#[derive(Debug)]
pub enum StreamEvent {
    /// A fix arrived from the provider
    Fix(LocationFix),
    /// The stream closed (intentionally, or the provider died)
    Ended,
}

/// Everything a live session holds from the platform.
#[derive(Default)]
pub struct SessionResources {
    subscription: Option<LocationSubscription>,
    background: Option<BackgroundGrant>,
    drain: Option<std::thread::JoinHandle<()>>,
}

impl SessionResources {
    /// No resources held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the location stream and background grant, and start draining
    /// fixes into `sink`.
    ///
    /// A failed stream subscription is fatal. A failed background grant is
    /// not: tracking still works while the app stays foregrounded, so the
    /// failure is logged and the session continues without the grant.
    pub fn acquire(
        &mut self,
        provider: &dyn LocationProvider,
        config: &LocationConfig,
        sink: impl Fn(StreamEvent) + Send + 'static,
    ) -> Result<(), LocationError> {
        self.release();

        let subscription = provider.subscribe(config)?;
        let receiver = subscription.receiver();

        let background = match provider.acquire_background() {
            Ok(grant) => Some(grant),
            Err(e) => {
                tracing::warn!("background execution grant unavailable: {e}");
                None
            }
        };

        let drain = std::thread::Builder::new()
            .name("location-drain".to_string())
            .spawn(move || {
                while let Ok(fix) = receiver.recv() {
                    sink(StreamEvent::Fix(fix));
                }
                sink(StreamEvent::Ended);
            })
            .map_err(|e| LocationError::StreamFailed(e.to_string()))?;

        self.subscription = Some(subscription);
        self.background = background;
        self.drain = Some(drain);

        tracing::info!("location stream acquired");
        Ok(())
    }

    /// Release everything. Idempotent; failures are logged and swallowed.
    pub fn release(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
            tracing::info!("location stream released");
        }
        if let Some(mut grant) = self.background.take() {
            grant.release();
            tracing::debug!("background execution grant released");
        }
        if let Some(drain) = self.drain.take() {
            // The drain exits once the stream disconnects; detach rather
            // than block the caller on provider teardown latency.
            drop(drain);
        }
    }

    /// Whether the location stream is currently held.
    pub fn is_held(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::provider::SimulatedLocationProvider;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fix(lat: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: -122.5,
            altitude: None,
            horizontal_accuracy: 5.0,
            timestamp: Utc::now(),
            speed: None,
        }
    }

    #[test]
    fn test_acquire_drains_fixes_then_signals_end() {
        let provider = SimulatedLocationProvider::new(
            vec![fix(45.5), fix(45.6)],
            Duration::from_millis(5),
        );

        let fixes = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let (f, e) = (fixes.clone(), ends.clone());

        let mut resources = SessionResources::new();
        resources
            .acquire(&provider, &LocationConfig::default(), move |event| {
                match event {
                    StreamEvent::Fix(_) => f.fetch_add(1, Ordering::SeqCst),
                    StreamEvent::Ended => e.fetch_add(1, Ordering::SeqCst),
                };
            })
            .unwrap();
        assert!(resources.is_held());

        // Short script: the stream drains fully and then closes.
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(fixes.load(Ordering::SeqCst), 2);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let provider = SimulatedLocationProvider::new(
            vec![fix(45.5); 100],
            Duration::from_millis(20),
        );

        let mut resources = SessionResources::new();
        resources
            .acquire(&provider, &LocationConfig::default(), |_| {})
            .unwrap();

        resources.release();
        assert!(!resources.is_held());
        resources.release();
        resources.release();
    }

    #[test]
    fn test_acquire_fails_when_disabled() {
        let provider = SimulatedLocationProvider::disabled();
        let mut resources = SessionResources::new();
        let result = resources.acquire(&provider, &LocationConfig::default(), |_| {});
        assert!(matches!(result, Err(LocationError::ServicesDisabled)));
        assert!(!resources.is_held());
    }
}
