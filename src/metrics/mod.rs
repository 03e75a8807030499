//! Derived workout metrics.

pub mod calories;

pub use calories::{estimate_calories, met_for_sport};
