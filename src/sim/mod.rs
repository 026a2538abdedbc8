/// Time-bounded device anomalies.
pub mod anomaly;
/// Tick counting for live and finite runs.
pub mod clock;
/// Per-tick device dynamics.
pub mod engine;
/// Seeded random source shared by fleet generation and ticks.
pub mod rng;
/// Background task that ticks the simulator on an interval.
#[cfg(feature = "api")]
pub mod ticker;
/// Simulator settings and tick summaries.
pub mod types;
