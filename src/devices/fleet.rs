//! Built-in device fleets used to seed the registry.

use chrono::{DateTime, Utc};

use super::types::{
    Consumption, ConsumptionLevel, Device, DeviceStatus, DeviceType, Location, Position,
};
use crate::sim::rng::SimRng;
use crate::tariff::Tariff;

/// Static description of one installed device.
struct DeviceTemplate {
    name: &'static str,
    device_type: DeviceType,
    building: &'static str,
    floor: i32,
    room: &'static str,
    position: (f64, f64, f64),
    average_watts: f64,
    status: DeviceStatus,
}

const fn template(
    name: &'static str,
    device_type: DeviceType,
    building: &'static str,
    floor: i32,
    room: &'static str,
    position: (f64, f64, f64),
    average_watts: f64,
) -> DeviceTemplate {
    DeviceTemplate {
        name,
        device_type,
        building,
        floor,
        room,
        position,
        average_watts,
        status: DeviceStatus::Online,
    }
}

#[rustfmt::skip]
const CAMPUS: &[DeviceTemplate] = &[
    template("Main Hall AC Unit 1", DeviceType::Hvac, "Building A", 1, "Main Hall", (5.0, 2.0, 10.0), 3200.0),
    template("Main Hall AC Unit 2", DeviceType::Hvac, "Building A", 1, "Main Hall", (15.0, 2.0, 10.0), 3400.0),
    template("Main Hall LED Panel 1", DeviceType::Lighting, "Building A", 1, "Main Hall", (10.0, 3.0, 10.0), 115.0),
    template("Reception Workstation", DeviceType::Computer, "Building A", 1, "Reception", (2.0, 1.0, 2.0), 280.0),
    template("Lab 201 Ventilation", DeviceType::Hvac, "Building A", 2, "Lab 201", (8.0, 2.0, 8.0), 2100.0),
    template("Lab 201 Spectrometer", DeviceType::Appliance, "Building A", 2, "Lab 201", (6.0, 1.0, 6.0), 850.0),
    template("Lab 201 Workstation", DeviceType::Computer, "Building A", 2, "Lab 201", (10.0, 1.0, 6.0), 420.0),
    template("Office 202 Ceiling Lights", DeviceType::Lighting, "Building A", 2, "Office 202", (15.0, 3.0, 5.0), 180.0),
    template("Server Rack Cooling", DeviceType::Hvac, "Building B", 1, "Server Room", (5.0, 2.0, 5.0), 4500.0),
    template("Server Rack 1", DeviceType::Server, "Building B", 1, "Server Room", (3.0, 1.0, 3.0), 2800.0),
    template("Server Rack 2", DeviceType::Server, "Building B", 1, "Server Room", (7.0, 1.0, 3.0), 2600.0),
    template("Cafeteria Refrigerator", DeviceType::Appliance, "Building B", 1, "Cafeteria", (12.0, 1.0, 8.0), 650.0),
    template("Cafeteria Oven", DeviceType::Appliance, "Building B", 1, "Cafeteria", (14.0, 1.0, 8.0), 2400.0),
    template("Classroom 201 Projector", DeviceType::Appliance, "Building B", 2, "Classroom 201", (8.0, 2.0, 8.0), 320.0),
    template("Classroom 201 Lights", DeviceType::Lighting, "Building B", 2, "Classroom 201", (8.0, 2.5, 12.0), 240.0),
    template("Gym Air Handler", DeviceType::Hvac, "Building C", 1, "Gym", (10.0, 2.0, 10.0), 3800.0),
    template("Gym Floodlights", DeviceType::Lighting, "Building C", 1, "Gym", (10.0, 4.0, 10.0), 900.0),
    template("Library Catalogue Terminal", DeviceType::Computer, "Building C", 1, "Library", (5.0, 2.0, 15.0), 150.0),
    template("Library Reading Lights", DeviceType::Lighting, "Building C", 1, "Library", (15.0, 2.0, 15.0), 300.0),
    template("Auditorium Sound System", DeviceType::Appliance, "Building C", 2, "Auditorium", (12.0, 2.0, 10.0), 1200.0),
    DeviceTemplate {
        status: DeviceStatus::Offline,
        ..template("Conference Room Display", DeviceType::Appliance, "Building C", 2, "Conference Room", (20.0, 2.0, 8.0), 200.0)
    },
];

/// Named fleet presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fleet {
    /// Three-building campus with HVAC, lighting, computing, servers and appliances.
    Campus,
    /// No devices at all.
    Empty,
}

impl Fleet {
    /// Available preset names.
    pub const NAMES: &[&str] = &["campus", "empty"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "campus" => Some(Fleet::Campus),
            "empty" => Some(Fleet::Empty),
            _ => None,
        }
    }

    /// Builds the fleet's devices, drawing per-device jitter from `rng`.
    pub fn build(self, rng: &mut SimRng, tariff: &Tariff, now: DateTime<Utc>) -> Vec<Device> {
        let templates: &[DeviceTemplate] = match self {
            Fleet::Campus => CAMPUS,
            Fleet::Empty => &[],
        };
        templates
            .iter()
            .enumerate()
            .map(|(i, template)| build_device(i + 1, template, rng, tariff, now))
            .collect()
    }
}

fn build_device(
    n: usize,
    template: &DeviceTemplate,
    rng: &mut SimRng,
    tariff: &Tariff,
    now: DateTime<Utc>,
) -> Device {
    let (x, y, z) = template.position;
    let mut device = Device {
        id: format!("dev-{n:03}"),
        name: template.name.to_string(),
        device_type: template.device_type,
        status: DeviceStatus::Online,
        location: Location {
            building: template.building.to_string(),
            floor: template.floor,
            room: template.room.to_string(),
            position: Position { x, y, z },
        },
        consumption: Consumption {
            current: 0.0,
            average: template.average_watts,
            peak: template.average_watts * 1.25,
            level: ConsumptionLevel::Low,
        },
        health: 0.0,
        anomaly_detected: false,
        cost_per_hour: 0.0,
        power_factor: rng.uniform(0.85, 0.95),
        last_update: now,
    };
    device.set_health(rng.uniform(75.0, 100.0));
    device.set_current_watts(template.average_watts * rng.uniform(0.9, 1.1), tariff.cost_per_kwh);
    device.set_status(template.status, tariff.cost_per_kwh);
    device
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campus_fleet_has_unique_sequential_ids() {
        let devices = Fleet::Campus.build(&mut SimRng::new(42), &Tariff::default(), Utc::now());
        assert_eq!(devices.len(), CAMPUS.len());
        assert_eq!(devices[0].id, "dev-001");

        let mut ids: Vec<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), devices.len());
    }

    #[test]
    fn campus_fleet_is_consistent() {
        let devices = Fleet::Campus.build(&mut SimRng::new(7), &Tariff::default(), Utc::now());
        for d in &devices {
            assert!((0.0..=100.0).contains(&d.health), "{} health {}", d.id, d.health);
            assert!(d.consumption.current >= 0.0);
            assert!(d.consumption.peak >= d.consumption.current);
            if !d.is_active() {
                assert_eq!(d.consumption.current, 0.0);
            }
        }
        assert!(devices.iter().any(|d| d.status == DeviceStatus::Offline));
    }

    #[test]
    fn every_type_is_represented() {
        let devices = Fleet::Campus.build(&mut SimRng::new(1), &Tariff::default(), Utc::now());
        for t in DeviceType::ALL {
            assert!(devices.iter().any(|d| d.device_type == t), "missing {t}");
        }
    }

    #[test]
    fn empty_fleet_and_names() {
        assert!(
            Fleet::Empty
                .build(&mut SimRng::new(1), &Tariff::default(), Utc::now())
                .is_empty()
        );
        assert_eq!(Fleet::from_name("campus"), Some(Fleet::Campus));
        assert_eq!(Fleet::from_name("mars"), None);
    }
}
