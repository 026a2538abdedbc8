//! Device model and built-in fleets.

/// Seed fleets for the registry.
pub mod fleet;
/// Device records, readings and updates.
pub mod types;

// Re-export the main types for convenience
pub use fleet::Fleet;
pub use types::{
    Consumption, ConsumptionLevel, Device, DeviceStatus, DeviceType, DeviceUpdate, Location,
    Position, Reading,
};

/// Hand-built devices for unit tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;

    use super::*;

    /// An online device in `building` drawing `watts` at its average.
    pub fn device(id: &str, building: &str, device_type: DeviceType, watts: f64) -> Device {
        Device {
            id: id.to_string(),
            name: format!("{device_type} {id}"),
            device_type,
            status: DeviceStatus::Online,
            location: Location {
                building: building.to_string(),
                floor: 1,
                room: "Room 101".to_string(),
                position: Position::default(),
            },
            consumption: Consumption {
                current: watts,
                average: watts,
                peak: watts,
                level: ConsumptionLevel::from_watts(watts),
            },
            health: 90.0,
            anomaly_detected: false,
            cost_per_hour: watts / 1000.0 * 0.12,
            power_factor: 0.9,
            last_update: Utc::now(),
        }
    }
}
