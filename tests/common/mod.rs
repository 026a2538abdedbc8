//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use campus_energy::devices::Fleet;
use campus_energy::registry::DeviceRegistry;
use campus_energy::sim::engine::Simulator;
use campus_energy::sim::rng::SimRng;
use campus_energy::sim::types::SimConfig;
use campus_energy::tariff::Tariff;

pub const SEED: u64 = 42;

/// Registry holding the campus fleet built from `seed`.
pub fn campus_registry(seed: u64) -> Arc<DeviceRegistry> {
    let tariff = Tariff::default();
    let devices = Fleet::Campus.build(&mut SimRng::new(seed), &tariff, Utc::now());
    Arc::new(DeviceRegistry::new(devices, 200, tariff))
}

/// Campus simulator with default dynamics.
pub fn campus_simulator(seed: u64) -> Simulator {
    Simulator::new(campus_registry(seed), SimConfig::new(seed))
}

/// Campus simulator that has already run `ticks` ticks.
pub fn warmed_up(seed: u64, ticks: u64) -> Simulator {
    let mut sim = campus_simulator(seed);
    sim.run(ticks);
    sim
}
