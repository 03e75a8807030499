//! Device location: fix types, signal quality classification, and the
//! provider boundary the engine consumes fixes through.

pub mod provider;
pub mod signal;
pub mod types;

pub use provider::{
    BackgroundGrant, LocationProvider, LocationSubscription, SimulatedLocationProvider,
};
pub use signal::classify_accuracy;
pub use types::{GpsQuality, GpsSignal, LocationConfig, LocationError, LocationFix};
