//! Telemetry simulator that advances every device in the registry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::devices::Reading;
use crate::registry::DeviceRegistry;

use super::anomaly::AnomalyWindow;
use super::clock::TickClock;
use super::rng::SimRng;
use super::types::{ANOMALY_FACTOR_MAX, ANOMALY_FACTOR_MIN, SimConfig, TickSummary};

/// Seed offset for the simulator RNG so it does not replay the fleet's draws.
const SIM_SEED_OFFSET: u64 = 1009;
/// Nominal supply voltage (V).
const NOMINAL_VOLTAGE: f64 = 220.0;
/// Health lost per tick while an anomaly is flagged.
const ANOMALY_HEALTH_PENALTY: f64 = 5.0;
/// Health regained per normal tick.
const HEALTH_RECOVERY: f64 = 0.5;

/// Advances the simulated fleet one tick at a time.
///
/// Owns the random source, the tick clock and the open anomaly windows; the
/// device records themselves stay in the shared [`DeviceRegistry`].
pub struct Simulator {
    registry: Arc<DeviceRegistry>,
    config: SimConfig,
    rng: SimRng,
    clock: TickClock,
    anomalies: HashMap<String, AnomalyWindow>,
}

impl Simulator {
    pub fn new(registry: Arc<DeviceRegistry>, config: SimConfig) -> Self {
        let rng = SimRng::new(config.seed.wrapping_add(SIM_SEED_OFFSET));
        Self {
            registry,
            config,
            rng,
            clock: TickClock::unbounded(),
            anomalies: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.clock.elapsed()
    }

    /// Number of anomalies currently open.
    pub fn open_anomalies(&self) -> usize {
        self.anomalies.len()
    }

    /// Runs one tick stamped with the current time.
    pub fn tick(&mut self) -> TickSummary {
        self.tick_at(Utc::now())
    }

    /// Runs `ticks` ticks back to back, e.g. to warm up reading histories.
    pub fn run(&mut self, ticks: u64) -> Vec<TickSummary> {
        let mut summaries = Vec::new();
        TickClock::bounded(ticks).run(|_| summaries.push(self.tick()));
        summaries
    }

    /// Runs one tick stamped with `now`.
    ///
    /// For every device that is not offline: resolves an expired anomaly,
    /// possibly starts a new one, perturbs the draw around its average,
    /// adjusts health and appends a reading.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> TickSummary {
        let tick = self.clock.tick().unwrap_or_default();
        let cost_per_kwh = self.registry.tariff().cost_per_kwh;
        let config = &self.config;
        let rng = &mut self.rng;
        let anomalies = &mut self.anomalies;

        let mut started = 0;
        let mut resolved = 0;

        let updated = self.registry.advance(|device| {
            if !device.is_active() {
                return None;
            }

            // Cleared through an update since the last tick.
            if !device.anomaly_detected {
                anomalies.remove(&device.id);
            }

            // Flagged through an update: the window starts now, at nominal draw.
            if device.anomaly_detected && !anomalies.contains_key(&device.id) {
                anomalies.insert(
                    device.id.clone(),
                    AnomalyWindow::new(tick, config.anomaly_duration_ticks, 1.0),
                );
                info!("anomaly on {} flagged by update at tick {tick}", device.id);
            }

            if anomalies
                .get(&device.id)
                .is_some_and(|window| !window.is_active(tick))
            {
                anomalies.remove(&device.id);
                device.anomaly_detected = false;
                resolved += 1;
                info!("anomaly on {} resolved at tick {tick}", device.id);
            }

            if !device.anomaly_detected && rng.chance(config.anomaly_probability) {
                let factor = rng.uniform(ANOMALY_FACTOR_MIN, ANOMALY_FACTOR_MAX);
                anomalies.insert(
                    device.id.clone(),
                    AnomalyWindow::new(tick, config.anomaly_duration_ticks, factor),
                );
                device.anomaly_detected = true;
                started += 1;
                info!(
                    "anomaly on {} ({}) at tick {tick}: x{factor:.2} average draw",
                    device.id, device.name
                );
            }

            let average = device.consumption.average;
            let watts = match anomalies.get(&device.id) {
                Some(window) => window.elevated_watts(average),
                None => average + rng.uniform(-config.variation, config.variation) * average,
            };
            device.set_current_watts(watts, cost_per_kwh);

            let health_delta = if device.anomaly_detected {
                -ANOMALY_HEALTH_PENALTY
            } else {
                HEALTH_RECOVERY
            };
            device.set_health(device.health + health_delta);

            let voltage = NOMINAL_VOLTAGE + rng.uniform(-5.0, 5.0);
            device.power_factor = rng.uniform(0.85, 0.95);
            device.last_update = now;

            Some(Reading {
                timestamp: now,
                device_id: device.id.clone(),
                consumption: device.consumption.current,
                voltage,
                current: device.consumption.current / voltage,
                power_factor: device.power_factor,
            })
        });

        let summary = TickSummary {
            tick,
            devices_updated: updated,
            anomalies_started: started,
            anomalies_resolved: resolved,
        };
        debug!("{summary}");
        summary
    }
}
