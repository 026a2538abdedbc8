//! Campus energy monitor: a simulated device fleet with live telemetry,
//! aggregate analytics and a JSON API for dashboards.

/// Fleet-wide and per-device aggregates.
pub mod analytics;
/// REST API over the live registry.
#[cfg(feature = "api")]
pub mod api;
/// Rule-based energy assistant.
pub mod assistant;
/// Command-line argument parsing.
pub mod cli;
/// TOML service configuration and presets.
pub mod config;
/// Device model and built-in fleets.
pub mod devices;
/// Reading export.
pub mod io;
/// Polling client for a running instance.
#[cfg(feature = "api")]
pub mod poller;
/// Shared device store and reading histories.
pub mod registry;
/// Fleet simulator, tick scheduling and anomaly injection.
pub mod sim;
/// Electricity cost and CO2 factors.
pub mod tariff;
