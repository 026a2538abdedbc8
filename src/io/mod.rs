//! File output.

/// CSV export of device readings.
pub mod export;
