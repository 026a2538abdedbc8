//! Fleet-wide aggregates computed from a registry snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::devices::{Device, DeviceStatus, DeviceType};
use crate::tariff::Tariff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// A mean was requested over zero values.
    #[error("division undefined: nothing to average")]
    DivisionUndefined,
}

/// Arithmetic mean of `values`.
///
/// # Errors
///
/// `AnalyticsError::DivisionUndefined` if `values` is empty.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Result<f64, AnalyticsError> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        return Err(AnalyticsError::DivisionUndefined);
    }
    Ok(sum / n as f64)
}

/// Headline figures for the dashboard overview.
///
/// Consumption figures are watts; cost and CO2 are per hour at the current draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_devices: usize,
    /// Devices whose status is exactly `online`.
    pub active_devices: usize,
    /// Sum of every device's current draw.
    pub total_consumption: f64,
    pub anomaly_count: usize,
    /// Zero for an empty fleet.
    pub average_consumption: f64,
    /// Largest single current draw; zero for an empty fleet.
    pub peak_consumption: f64,
    pub estimated_cost: f64,
    pub co2_emissions: f64,
    pub average_health: f64,
}

impl Overview {
    pub fn from_devices(devices: &[Device], tariff: &Tariff) -> Self {
        let total_consumption: f64 = devices.iter().map(|d| d.consumption.current).sum();
        let peak_consumption = devices
            .iter()
            .map(|d| d.consumption.current)
            .fold(0.0_f64, f64::max);

        Self {
            total_devices: devices.len(),
            active_devices: devices
                .iter()
                .filter(|d| d.status == DeviceStatus::Online)
                .count(),
            total_consumption,
            anomaly_count: devices.iter().filter(|d| d.anomaly_detected).count(),
            average_consumption: mean(devices.iter().map(|d| d.consumption.current))
                .unwrap_or(0.0),
            peak_consumption,
            estimated_cost: tariff.hourly_cost(total_consumption),
            co2_emissions: tariff.hourly_co2(total_consumption),
            average_health: mean(devices.iter().map(|d| d.health)).unwrap_or(0.0),
        }
    }
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Campus Overview ---")?;
        writeln!(
            f,
            "Devices:            {} ({} online, {} anomalous)",
            self.total_devices, self.active_devices, self.anomaly_count
        )?;
        writeln!(f, "Total consumption:  {:.1} W", self.total_consumption)?;
        writeln!(f, "Average / peak:     {:.1} W / {:.1} W", self.average_consumption, self.peak_consumption)?;
        writeln!(f, "Cost:               ${:.3}/h", self.estimated_cost)?;
        writeln!(f, "CO2:                {:.3} kg/h", self.co2_emissions)?;
        write!(f, "Average health:     {:.1}", self.average_health)
    }
}

/// Consumption of the devices in one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingBreakdown {
    pub building: String,
    pub device_count: usize,
    pub consumption: f64,
    pub cost: f64,
}

/// One entry per building present in `devices`, sorted by building name.
pub fn by_building(devices: &[Device], tariff: &Tariff) -> Vec<BuildingBreakdown> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for d in devices {
        let entry = groups.entry(d.location.building.as_str()).or_default();
        entry.0 += 1;
        entry.1 += d.consumption.current;
    }

    groups
        .into_iter()
        .map(|(building, (device_count, consumption))| BuildingBreakdown {
            building: building.to_string(),
            device_count,
            consumption,
            cost: tariff.hourly_cost(consumption),
        })
        .collect()
}

/// Consumption of the devices of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub device_count: usize,
    pub consumption: f64,
    /// Share of total consumption; zero when nothing is drawing power.
    pub percentage: f64,
}

/// One entry per device type, in [`DeviceType::ALL`] order, including empty types.
pub fn by_type(devices: &[Device]) -> Vec<TypeBreakdown> {
    let total: f64 = devices.iter().map(|d| d.consumption.current).sum();

    DeviceType::ALL
        .into_iter()
        .map(|device_type| {
            let (device_count, consumption) = devices
                .iter()
                .filter(|d| d.device_type == device_type)
                .fold((0, 0.0), |(n, w), d| (n + 1, w + d.consumption.current));
            let percentage = if total > 0.0 {
                consumption / total * 100.0
            } else {
                0.0
            };
            TypeBreakdown {
                device_type,
                device_count,
                consumption,
                percentage,
            }
        })
        .collect()
}

/// Realtime aggregate over the devices that are switched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetAnalytics {
    pub total_consumption: f64,
    pub total_cost: f64,
    #[serde(rename = "totalCO2")]
    pub total_co2: f64,
    pub active_devices: usize,
    pub total_devices: usize,
    pub anomalies: usize,
    pub offline_devices: usize,
    pub average_health: f64,
    /// Mean power factor as a percentage.
    pub efficiency: f64,
}

impl FleetAnalytics {
    pub fn from_devices(devices: &[Device], tariff: &Tariff) -> Self {
        let active: Vec<&Device> = devices.iter().filter(|d| d.is_active()).collect();
        let total_consumption: f64 = active.iter().map(|d| d.consumption.current).sum();

        Self {
            total_consumption,
            total_cost: tariff.hourly_cost(total_consumption),
            total_co2: tariff.hourly_co2(total_consumption),
            active_devices: active.len(),
            total_devices: devices.len(),
            anomalies: devices.iter().filter(|d| d.anomaly_detected).count(),
            offline_devices: devices.len() - active.len(),
            average_health: mean(devices.iter().map(|d| d.health)).unwrap_or(0.0),
            efficiency: mean(devices.iter().map(|d| d.power_factor * 100.0)).unwrap_or(0.0),
        }
    }
}

/// Progress towards SDG 7 (clean energy) and SDG 13 (climate action), in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SdgProgress {
    pub sdg7: f64,
    pub sdg13: f64,
}

impl SdgProgress {
    pub fn from_analytics(analytics: &FleetAnalytics) -> Self {
        Self {
            sdg7: analytics.efficiency.clamp(0.0, 100.0),
            sdg13: (100.0 - analytics.total_co2 / 10.0).clamp(0.0, 100.0),
        }
    }
}
