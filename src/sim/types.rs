//! Simulator parameters and per-tick outcomes.

use std::fmt;

/// Lower bound of the multiplier applied to a device's average during an anomaly.
pub const ANOMALY_FACTOR_MIN: f64 = 1.5;
/// Upper bound of the anomaly multiplier.
pub const ANOMALY_FACTOR_MAX: f64 = 2.0;

/// Parameters of the telemetry simulator.
///
/// # Examples
///
/// ```
/// use campus_energy::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(42);
/// assert_eq!(cfg.seed, 42);
/// assert!(cfg.variation > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Maximum relative deviation from the average draw on a normal tick.
    pub variation: f64,
    /// Per-device, per-tick probability of an anomaly starting.
    pub anomaly_probability: f64,
    /// Ticks an anomaly lasts before resolving itself; 0 means manual clearing only.
    pub anomaly_duration_ticks: u64,
}

impl SimConfig {
    /// Creates a configuration with default dynamics and the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            variation: 0.1,
            anomaly_probability: 0.05,
            anomaly_duration_ticks: 6,
        }
    }

    /// Same dynamics, but anomalies never start.
    pub fn without_anomalies(mut self) -> Self {
        self.anomaly_probability = 0.0;
        self
    }
}

/// What one simulator tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick index.
    pub tick: u64,
    /// Devices that produced a reading.
    pub devices_updated: usize,
    /// Anomalies that started on this tick.
    pub anomalies_started: usize,
    /// Anomalies whose window expired on this tick.
    pub anomalies_resolved: usize,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick={:>5} | updated={:>3} anomalies(+{}, -{})",
            self.tick, self.devices_updated, self.anomalies_started, self.anomalies_resolved,
        )
    }
}
