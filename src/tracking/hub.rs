//! Observer registry for live state snapshots.
//!
//! Every mutation in the engine ends with a broadcast. Observers receive an
//! owned value copy of the state, never a reference into the live record,
//! and are called in no particular order.

use crate::tracking::types::TrackingState;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Callback receiving state snapshots.
pub type ObserverFn = Box<dyn Fn(TrackingState) + Send>;

/// Handle returned by [`SubscriptionHub::subscribe`]; pass it back to
/// [`SubscriptionHub::unsubscribe`] to stop receiving snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(Uuid);

/// Thread-safe set of state observers.
#[derive(Default)]
pub struct SubscriptionHub {
    observers: Mutex<HashMap<Uuid, ObserverFn>>,
}

impl SubscriptionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer and return its unsubscribe token.
    pub fn subscribe(&self, observer: impl Fn(TrackingState) + Send + 'static) -> SubscriptionToken {
        let id = Uuid::new_v4();
        self.lock().insert(id, Box::new(observer));
        SubscriptionToken(id)
    }

    /// Remove an observer. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.lock().remove(&token.0);
    }

    /// Deliver a snapshot copy to every observer.
    pub fn broadcast(&self, snapshot: &TrackingState) {
        let observers = self.lock();
        for observer in observers.values() {
            observer(snapshot.clone());
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ObserverFn>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
