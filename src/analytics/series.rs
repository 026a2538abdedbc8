//! Synthetic hourly curves for chart windows.
//!
//! Reading histories only cover the last few minutes of ticks, so day-long
//! windows are derived analytically from the current snapshot.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::devices::Device;
use crate::tariff::Tariff;

/// First and last hour (inclusive, UTC) treated as business hours.
const BUSINESS_HOURS: std::ops::RangeInclusive<u32> = 9..=18;
const BUSINESS_LOAD_FACTOR: f64 = 0.8;
const OFF_HOURS_LOAD_FACTOR: f64 = 0.4;
/// Relative amplitude of the daily sine curve.
const DAILY_SWING: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    /// Draw in watts.
    pub consumption: f64,
    pub cost: f64,
}

/// Hourly curve of `hours` points ending at `now`, swinging +/-30 % around
/// `total_watts` over one period.
pub fn time_series(
    total_watts: f64,
    now: DateTime<Utc>,
    hours: usize,
    tariff: &Tariff,
) -> Vec<SeriesPoint> {
    (0..hours)
        .map(|i| {
            let back = (hours - 1 - i) as i64;
            let phase = i as f64 / hours as f64 * std::f64::consts::TAU;
            let consumption = (total_watts + phase.sin() * DAILY_SWING * total_watts).max(0.0);
            SeriesPoint {
                timestamp: now - Duration::hours(back),
                consumption,
                cost: tariff.hourly_cost(consumption),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub consumption: f64,
    pub cost: f64,
    pub co2: f64,
}

/// `hours + 1` hourly points from `now - hours` to `now`, scaling the current
/// fleet draw by a business-hours load factor.
pub fn trends(
    devices: &[Device],
    now: DateTime<Utc>,
    hours: usize,
    tariff: &Tariff,
) -> Vec<TrendPoint> {
    let current: f64 = devices
        .iter()
        .filter(|d| d.is_active())
        .map(|d| d.consumption.current)
        .sum();

    (0..=hours)
        .rev()
        .map(|back| {
            let timestamp = now - Duration::hours(back as i64);
            let factor = if BUSINESS_HOURS.contains(&timestamp.hour()) {
                BUSINESS_LOAD_FACTOR
            } else {
                OFF_HOURS_LOAD_FACTOR
            };
            let consumption = current * factor;
            TrendPoint {
                timestamp,
                consumption,
                cost: tariff.hourly_cost(consumption),
                co2: tariff.hourly_co2(consumption),
            }
        })
        .collect()
}
