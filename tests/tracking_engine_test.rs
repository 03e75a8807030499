//! Integration tests for the tracking engine over the public API, driven by
//! the simulated location provider.

use openstride::location::types::LocationFix;
use openstride::{
    SimulatedLocationProvider, SportType, TrackerConfig, TrackingEngine, TrackingError,
    TrackingStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Northbound fixes spaced `step_m` apart with excellent accuracy.
fn route(fixes: usize, step_m: f64) -> Vec<LocationFix> {
    let step_deg = step_m / 111_195.0;
    (0..fixes)
        .map(|i| LocationFix {
            latitude: 45.5 + i as f64 * step_deg,
            longitude: -122.65,
            altitude: Some(60.0),
            horizontal_accuracy: 4.0,
            timestamp: chrono::Utc::now(),
            speed: None,
        })
        .collect()
}

fn engine_with(script: Vec<LocationFix>, emit_every: Duration) -> TrackingEngine {
    let provider = Arc::new(SimulatedLocationProvider::new(script, emit_every));
    TrackingEngine::new(provider, TrackerConfig::default())
}

#[tokio::test]
async fn test_full_session_produces_metrics() {
    let engine = engine_with(route(30, 5.0), Duration::from_millis(50));

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    assert_eq!(engine.get_state().status, TrackingStatus::Tracking);

    // Let the full script drain: 30 fixes, 29 hops of ~5 m each.
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let state = engine.get_state();
    assert!((state.distance_meters - 145.0).abs() < 5.0);
    assert!(state.elapsed_seconds >= 1);
    assert!(state.gps_signal.is_some());
    assert!(state.last_location.is_some());

    let metrics = engine.stop_tracking().unwrap();
    assert_eq!(metrics.session_id, "run-1");
    assert_eq!(metrics.sport_type, SportType::Running);
    assert!((metrics.distance_meters - 145.0).abs() < 5.0);
    assert_eq!(
        serde_json::to_value(metrics.data_source).unwrap(),
        serde_json::json!("live_tracking")
    );
    assert_eq!(engine.get_state().status, TrackingStatus::Summary);
}

#[tokio::test]
async fn test_start_is_idempotent_for_same_session_id() {
    let engine = engine_with(route(200, 5.0), Duration::from_millis(50));

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let before = engine.get_state();

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    let after = engine.get_state();
    assert_eq!(after.session_id, before.session_id);
    assert!(after.distance_meters >= before.distance_meters);
    assert_eq!(after.status, TrackingStatus::Tracking);

    let err = engine
        .start_tracking("run-2", SportType::Cycling, None, None)
        .unwrap_err();
    assert!(matches!(err, TrackingError::SessionAlreadyActive(id) if id == "run-1"));

    engine.discard_tracking();
}

#[tokio::test]
async fn test_stop_without_session_fails() {
    let engine = engine_with(route(5, 5.0), Duration::from_millis(50));
    assert!(matches!(
        engine.stop_tracking(),
        Err(TrackingError::NoActiveSession)
    ));
}

#[tokio::test]
async fn test_gps_availability_check() {
    let engine = engine_with(route(5, 5.0), Duration::from_millis(50));
    let signal = engine.check_gps_availability().unwrap();
    assert_eq!(signal.accuracy, 4.0);
    assert_eq!(signal.quality, openstride::GpsQuality::Excellent);

    let disabled = TrackingEngine::new(
        Arc::new(SimulatedLocationProvider::disabled()),
        TrackerConfig::default(),
    );
    assert!(disabled.check_gps_availability().is_err());
    assert!(disabled
        .start_tracking("run-1", SportType::Running, None, None)
        .is_err());
}

#[tokio::test]
async fn test_observers_receive_snapshots_until_unsubscribed() {
    let engine = engine_with(route(200, 5.0), Duration::from_millis(50));

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let token = engine.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let delivered = seen.load(Ordering::SeqCst);
    assert!(delivered > 1, "expected several broadcasts, got {delivered}");

    engine.unsubscribe(token);
    tokio::time::sleep(Duration::from_millis(300)).await;
    let after_unsubscribe = seen.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(seen.load(Ordering::SeqCst), after_unsubscribe);

    engine.discard_tracking();
}

#[tokio::test]
async fn test_pause_and_resume_account_time() {
    let engine = engine_with(route(400, 5.0), Duration::from_millis(50));

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    engine.pause_tracking().unwrap();
    assert_eq!(engine.get_state().status, TrackingStatus::Paused);
    let elapsed_at_pause = engine.get_state().elapsed_seconds;

    tokio::time::sleep(Duration::from_millis(1600)).await;
    // The clock is stopped while paused.
    assert_eq!(engine.get_state().elapsed_seconds, elapsed_at_pause);

    engine.resume_tracking().unwrap();
    let state = engine.get_state();
    assert_eq!(state.status, TrackingStatus::Tracking);
    assert!(state.total_paused_seconds >= 1);
    assert_eq!(state.paused_at, None);

    engine.discard_tracking();
}

#[tokio::test]
async fn test_discard_resets_to_idle() {
    let engine = engine_with(route(100, 5.0), Duration::from_millis(50));

    engine
        .start_tracking("run-1", SportType::Running, None, None)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(engine.get_state().distance_meters > 0.0);

    engine.discard_tracking();
    let state = engine.get_state();
    assert_eq!(state.status, TrackingStatus::Idle);
    assert_eq!(state.session_id, None);
    assert_eq!(state.distance_meters, 0.0);
    assert_eq!(state.elapsed_seconds, 0);

    // Idempotent, and the engine is reusable afterwards.
    engine.discard_tracking();
    engine
        .start_tracking("run-2", SportType::Walking, None, None)
        .unwrap();
    assert_eq!(engine.get_state().status, TrackingStatus::Tracking);
    engine.discard_tracking();
}
