//! Read-only aggregation over device snapshots.
//!
//! Every function here is pure: it takes the devices (and readings) it needs
//! plus a [`Tariff`](crate::tariff::Tariff) and never touches the registry.

/// Per-device scores and forecasts.
pub mod insights;
/// Hourly series and trends.
pub mod series;
/// Totals and breakdowns over a fleet snapshot.
pub mod summary;

pub use insights::DeviceInsights;
pub use series::{SeriesPoint, TrendPoint, time_series, trends};
pub use summary::{
    AnalyticsError, BuildingBreakdown, FleetAnalytics, Overview, SdgProgress, TypeBreakdown,
    by_building, by_type, mean,
};
