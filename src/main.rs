//! OpenStride - Live GPS Workout Tracking Engine
//!
//! Demo entry point: replays a simulated run through the engine and prints
//! the finalized workout metrics as JSON.

use openstride::location::types::LocationFix;
use openstride::{
    SegmentTarget, SimulatedLocationProvider, SportType, TrackerConfig, TrackingEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fixes along a straight northbound line, spaced `step_m` apart.
fn simulated_route(fixes: usize, step_m: f64) -> Vec<LocationFix> {
    // One degree of latitude is ~111.195 km.
    let step_deg = step_m / 111_195.0;
    (0..fixes)
        .map(|i| LocationFix {
            latitude: 45.5 + i as f64 * step_deg,
            longitude: -122.65,
            altitude: Some(60.0 + (i / 10) as f64 * 4.0),
            horizontal_accuracy: 4.0,
            timestamp: chrono::Utc::now(),
            speed: None,
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpenStride v{}", env!("CARGO_PKG_VERSION"));

    // Replay a short jog at ~3 m/s logical spacing, one fix per 300 ms of
    // wall time so the demo finishes quickly.
    let provider = Arc::new(SimulatedLocationProvider::new(
        simulated_route(50, 3.0),
        Duration::from_millis(300),
    ));
    let engine = TrackingEngine::new(provider, TrackerConfig::default());

    let signal = engine.check_gps_availability()?;
    tracing::info!(quality = %signal.quality, accuracy_m = signal.accuracy, "GPS ready");

    let _token = engine.subscribe(|state| {
        tracing::debug!(
            status = %state.status,
            distance_m = state.distance_meters,
            "state update"
        );
    });

    engine.start_tracking(
        "demo-session",
        SportType::Running,
        Some(vec![SegmentTarget::time(5), SegmentTarget::Open]),
        Some(Box::new(|alert| tracing::info!(?alert, "segment alert"))),
    )?;

    tokio::time::sleep(Duration::from_secs(8)).await;
    engine.skip_to_next_segment()?;
    tokio::time::sleep(Duration::from_secs(4)).await;

    let metrics = engine.stop_tracking()?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
