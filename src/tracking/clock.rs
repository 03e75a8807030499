//! 1 Hz session clock.
//!
//! The clock is the only time-based driver of elapsed seconds. It is fully
//! stopped while the session is paused, never merely ignored, so a resumed
//! session cannot double-count a straddling tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Periodic driver for the tracking engine's tick handler.
pub struct SessionClock {
    runtime: Handle,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl SessionClock {
    /// Create a stopped clock that will spawn its ticker on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            handle: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start ticking once per second. `on_tick` returns whether the clock
    /// should keep running, so the tick handler can stop it from within.
    ///
    /// Any previous ticker is stopped first.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();

        self.handle = Some(self.runtime.spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(
                tokio::time::Instant::now() + period,
                period,
            );
            loop {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if !on_tick() {
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }));

        tracing::debug!("session clock started");
    }

    /// Stop ticking. Idempotent; safe from any thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("session clock stopped");
        }
    }

    /// Whether a ticker is currently live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn test_clock_ticks_and_stops() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();

        let mut clock = SessionClock::new(Handle::current());
        clock.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(clock.is_running());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        clock.stop();
        let seen = ticks.load(Ordering::SeqCst);
        assert!((2..=3).contains(&seen), "expected ~2 ticks, got {seen}");

        // Stopped: no further ticks accumulate.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert!(!clock.is_running());
    }

    #[tokio::test]
    async fn test_tick_handler_can_stop_clock() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();

        let mut clock = SessionClock::new(Handle::current());
        clock.start(move || counter.fetch_add(1, Ordering::SeqCst) < 1);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        // Handler returned false on the second tick.
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!clock.is_running());
    }
}
