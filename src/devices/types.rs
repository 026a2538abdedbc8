//! Device records, readings and partial updates shared by the registry,
//! simulator and API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Consumption (W) at or above which a device counts as a high consumer.
pub const HIGH_LEVEL_WATTS: f64 = 1000.0;
/// Consumption (W) at or above which a device counts as a medium consumer.
pub const MEDIUM_LEVEL_WATTS: f64 = 200.0;

/// Category of energy-consuming asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "HVAC")]
    Hvac,
    Lighting,
    Computer,
    Server,
    Appliance,
}

impl DeviceType {
    /// Every device type, in reporting order.
    pub const ALL: [DeviceType; 5] = [
        DeviceType::Hvac,
        DeviceType::Lighting,
        DeviceType::Computer,
        DeviceType::Server,
        DeviceType::Appliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Hvac => "HVAC",
            DeviceType::Lighting => "Lighting",
            DeviceType::Computer => "Computer",
            DeviceType::Server => "Server",
            DeviceType::Appliance => "Appliance",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status reported for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Warning => "warning",
            DeviceStatus::Error => "error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse consumption bucket used by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionLevel {
    High,
    Medium,
    Low,
}

impl ConsumptionLevel {
    pub fn from_watts(watts: f64) -> Self {
        if watts >= HIGH_LEVEL_WATTS {
            ConsumptionLevel::High
        } else if watts >= MEDIUM_LEVEL_WATTS {
            ConsumptionLevel::Medium
        } else {
            ConsumptionLevel::Low
        }
    }
}

/// Position inside a room, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Where a device is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub building: String,
    pub floor: i32,
    pub room: String,
    pub position: Position,
}

/// Power draw figures in watts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    /// Latest draw.
    pub current: f64,
    /// Nominal draw the simulator varies around.
    pub average: f64,
    /// Highest draw seen since creation.
    pub peak: f64,
    pub level: ConsumptionLevel,
}

/// A simulated energy-consuming asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub location: Location,
    pub consumption: Consumption,
    /// Health score in `[0, 100]`.
    pub health: f64,
    pub anomaly_detected: bool,
    /// Running cost at the current draw.
    pub cost_per_hour: f64,
    pub power_factor: f64,
    pub last_update: DateTime<Utc>,
}

impl Device {
    /// Returns `true` unless the device is switched off.
    pub fn is_active(&self) -> bool {
        self.status != DeviceStatus::Offline
    }

    /// Current draw in kilowatts.
    pub fn current_kw(&self) -> f64 {
        self.consumption.current / 1000.0
    }

    /// Sets the current draw, keeping peak, level and running cost consistent.
    ///
    /// Negative and non-finite values are treated as zero.
    pub fn set_current_watts(&mut self, watts: f64, cost_per_kwh: f64) {
        let watts = if watts.is_finite() { watts.max(0.0) } else { 0.0 };
        self.consumption.current = watts;
        if watts > self.consumption.peak {
            self.consumption.peak = watts;
        }
        self.consumption.level = ConsumptionLevel::from_watts(watts);
        self.cost_per_hour = watts / 1000.0 * cost_per_kwh;
    }

    /// Changes status; going offline drops the draw to zero and coming back
    /// resumes at the average.
    pub fn set_status(&mut self, status: DeviceStatus, cost_per_kwh: f64) {
        let was_active = self.is_active();
        self.status = status;
        match (was_active, self.is_active()) {
            (true, false) => self.set_current_watts(0.0, cost_per_kwh),
            (false, true) => self.set_current_watts(self.consumption.average, cost_per_kwh),
            _ => {}
        }
    }

    /// Sets health, clamped to `[0, 100]`.
    pub fn set_health(&mut self, health: f64) {
        self.health = if health.is_finite() {
            health.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Merges a partial update into the record.
    pub fn apply(&mut self, update: DeviceUpdate, cost_per_kwh: f64, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(status) = update.status {
            self.set_status(status, cost_per_kwh);
        }
        if let Some(health) = update.health {
            self.set_health(health);
        }
        // An offline device keeps drawing zero whatever the update says.
        if let Some(watts) = update.consumption.filter(|_| self.is_active()) {
            self.set_current_watts(watts, cost_per_kwh);
        }
        if let Some(flag) = update.anomaly_detected {
            self.anomaly_detected = flag;
        }
        self.last_update = now;
    }
}

/// A timestamped consumption sample for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    /// Draw in watts.
    pub consumption: f64,
    /// Supply voltage (V).
    pub voltage: f64,
    /// Line current (A).
    pub current: f64,
    pub power_factor: f64,
}

/// Partial device update accepted by `POST /devices` with `action: "update"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub status: Option<DeviceStatus>,
    pub health: Option<f64>,
    /// Current draw in watts.
    pub consumption: Option<f64>,
    pub anomaly_detected: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            id: "dev-001".to_string(),
            name: "Main Hall AC Unit 1".to_string(),
            device_type: DeviceType::Hvac,
            status: DeviceStatus::Online,
            location: Location {
                building: "Building A".to_string(),
                floor: 1,
                room: "Main Hall".to_string(),
                position: Position::default(),
            },
            consumption: Consumption {
                current: 3500.0,
                average: 3200.0,
                peak: 4000.0,
                level: ConsumptionLevel::High,
            },
            health: 85.0,
            anomaly_detected: false,
            cost_per_hour: 0.42,
            power_factor: 0.9,
            last_update: Utc::now(),
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(ConsumptionLevel::from_watts(1200.0), ConsumptionLevel::High);
        assert_eq!(ConsumptionLevel::from_watts(200.0), ConsumptionLevel::Medium);
        assert_eq!(ConsumptionLevel::from_watts(199.9), ConsumptionLevel::Low);
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(DeviceType::Hvac).unwrap(), "HVAC");
        assert_eq!(DeviceType::Lighting.to_string(), "Lighting");
        let status: DeviceStatus = serde_json::from_str(r#""warning""#).unwrap();
        assert_eq!(status, DeviceStatus::Warning);
        assert_eq!(status.to_string(), "warning");
    }

    #[test]
    fn device_serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(sample_device()).unwrap();
        assert_eq!(json["type"], "HVAC");
        assert_eq!(json["status"], "online");
        assert_eq!(json["anomalyDetected"], false);
        assert_eq!(json["consumption"]["level"], "high");
        assert!(json.get("costPerHour").is_some());
    }

    #[test]
    fn negative_draw_is_clamped_and_peak_tracks_maximum() {
        let mut device = sample_device();
        device.set_current_watts(-50.0, 0.12);
        assert_eq!(device.consumption.current, 0.0);
        assert_eq!(device.cost_per_hour, 0.0);

        device.set_current_watts(5000.0, 0.12);
        assert_eq!(device.consumption.peak, 5000.0);
        assert!((device.cost_per_hour - 0.6).abs() < 1e-9);
    }

    #[test]
    fn offline_devices_draw_nothing() {
        let mut device = sample_device();
        device.set_status(DeviceStatus::Offline, 0.12);
        assert_eq!(device.consumption.current, 0.0);

        device.set_status(DeviceStatus::Online, 0.12);
        assert_eq!(device.consumption.current, 3200.0);
    }

    #[test]
    fn health_is_clamped() {
        let mut device = sample_device();
        device.set_health(140.0);
        assert_eq!(device.health, 100.0);
        device.set_health(-3.0);
        assert_eq!(device.health, 0.0);
    }

    #[test]
    fn update_rejects_unknown_fields() {
        let parsed: Result<DeviceUpdate, _> =
            serde_json::from_str(r#"{"health": 50, "colour": "red"}"#);
        assert!(parsed.is_err());
    }
}
