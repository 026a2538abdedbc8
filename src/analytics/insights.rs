use serde::{Deserialize, Serialize};

use crate::devices::{Device, Reading};
use crate::tariff::Tariff;

use super::summary::mean;

/// Fewer readings than this and the anomaly score is zero.
const MIN_READINGS_FOR_SCORE: usize = 2;
/// Readings averaged for the next-hour forecast.
const FORECAST_WINDOW: usize = 3;
/// Supply deviation from nominal that counts towards maintenance risk.
const VOLTAGE_TOLERANCE: f64 = 0.05;
const NOMINAL_VOLTAGE: f64 = 220.0;

/// Per-device derived figures shown next to its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInsights {
    pub device_id: String,
    pub cost_per_hour: f64,
    pub co2_per_hour: f64,
    /// Deviation of the current draw from the history mean, in percent, capped at 100.
    pub anomaly_score: f64,
    /// Mean of the last three readings; zero with a shorter history.
    pub next_hour_consumption: f64,
    pub daily_cost: f64,
    /// 0 to 100.
    pub maintenance_risk: f64,
}

impl DeviceInsights {
    /// `readings` is the device's history, oldest first.
    pub fn compute(device: &Device, readings: &[Reading], tariff: &Tariff) -> Self {
        let current = device.consumption.current;
        let history_mean = mean(readings.iter().map(|r| r.consumption)).ok();

        let anomaly_score = match history_mean {
            Some(avg) if readings.len() >= MIN_READINGS_FOR_SCORE && avg > 0.0 => {
                ((current - avg).abs() / avg * 100.0).min(100.0)
            }
            _ => 0.0,
        };

        let next_hour_consumption = if readings.len() >= FORECAST_WINDOW {
            mean(
                readings[readings.len() - FORECAST_WINDOW..]
                    .iter()
                    .map(|r| r.consumption),
            )
            .unwrap_or(0.0)
        } else {
            0.0
        };

        let daily_cost = tariff.hourly_cost(history_mean.unwrap_or(current)) * 24.0;

        Self {
            device_id: device.id.clone(),
            cost_per_hour: tariff.hourly_cost(current),
            co2_per_hour: tariff.hourly_co2(current),
            anomaly_score,
            next_hour_consumption,
            daily_cost,
            maintenance_risk: maintenance_risk(device, readings.last()),
        }
    }
}

fn maintenance_risk(device: &Device, latest: Option<&Reading>) -> f64 {
    let mut risk = 0.0;
    if device.health < 70.0 {
        risk += 30.0;
    } else if device.health < 85.0 {
        risk += 15.0;
    }
    if device.anomaly_detected {
        risk += 25.0;
    }
    if latest.is_some_and(|r| (r.voltage - NOMINAL_VOLTAGE).abs() > NOMINAL_VOLTAGE * VOLTAGE_TOLERANCE) {
        risk += 15.0;
    }
    f64::min(risk, 100.0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::devices::DeviceType;
    use crate::devices::fixtures::device;

    fn reading(watts: f64) -> Reading {
        Reading {
            timestamp: Utc::now(),
            device_id: "dev-001".into(),
            consumption: watts,
            voltage: 220.0,
            current: watts / 220.0,
            power_factor: 0.9,
        }
    }

    #[test]
    fn short_history_scores_zero() {
        let d = device("dev-001", "Building A", DeviceType::Server, 800.0);
        let i = DeviceInsights::compute(&d, &[reading(400.0)], &Tariff::default());
        assert_eq!(i.anomaly_score, 0.0);
        assert_eq!(i.next_hour_consumption, 0.0);

        let none = DeviceInsights::compute(&d, &[], &Tariff::default());
        assert_eq!(none.anomaly_score, 0.0);
        // No history: daily cost falls back to the current draw.
        assert!((none.daily_cost - 0.8 * 0.12 * 24.0).abs() < 1e-9);
    }

    #[test]
    fn score_and_forecast_from_history() {
        let d = device("dev-001", "Building A", DeviceType::Server, 600.0);
        let history: Vec<Reading> = [100.0, 200.0, 300.0, 400.0, 500.0]
            .into_iter()
            .map(reading)
            .collect();
        let i = DeviceInsights::compute(&d, &history, &Tariff::default());
        // Mean 300, current 600.
        assert_eq!(i.anomaly_score, 100.0);
        assert_eq!(i.next_hour_consumption, 400.0);
        assert!((i.daily_cost - 0.3 * 0.12 * 24.0).abs() < 1e-9);
        assert!((i.cost_per_hour - 0.072).abs() < 1e-9);
    }

    #[test]
    fn score_is_capped() {
        let d = device("dev-001", "Building A", DeviceType::Server, 10_000.0);
        let history = vec![reading(10.0), reading(10.0)];
        let i = DeviceInsights::compute(&d, &history, &Tariff::default());
        assert_eq!(i.anomaly_score, 100.0);
    }

    #[test]
    fn maintenance_risk_accumulates() {
        let mut d = device("dev-001", "Building A", DeviceType::Hvac, 1000.0);
        assert_eq!(DeviceInsights::compute(&d, &[], &Tariff::default()).maintenance_risk, 0.0);

        d.health = 80.0;
        assert_eq!(DeviceInsights::compute(&d, &[], &Tariff::default()).maintenance_risk, 15.0);

        d.health = 50.0;
        d.anomaly_detected = true;
        let mut sag = reading(1000.0);
        sag.voltage = 200.0;
        let risk = DeviceInsights::compute(&d, &[sag], &Tariff::default()).maintenance_risk;
        assert_eq!(risk, 70.0);
    }
}
