//! TOML-based service configuration and preset definitions.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::devices::Fleet;
use crate::registry::DEFAULT_HISTORY_LIMIT;
use crate::sim::types::SimConfig;
use crate::tariff::Tariff;

/// Upper bound on `simulation.warmup_ticks`.
pub const MAX_WARMUP_TICKS: u64 = 100_000;

/// Top-level service configuration parsed from TOML.
///
/// Every section and field has a default matching the `campus` preset, so
/// a file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub tariff: Tariff,
    pub polling: PollingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// IP address to bind.
    pub bind: String,
    pub port: u16,
    /// Bearer token for `/v1/analytics`. Unset locks the route.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            api_key: None,
        }
    }
}

/// Fleet and simulator dynamics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Fleet preset: `"campus"` or `"empty"`.
    pub fleet: String,
    /// Master random seed.
    pub seed: u64,
    /// Wall-clock time between ticks (ms, must be > 0).
    pub tick_interval_ms: u64,
    /// Relative draw variation on a normal tick (0.0 to 1.0).
    pub variation: f64,
    /// Per-device, per-tick anomaly probability (0.0 to 1.0).
    pub anomaly_probability: f64,
    /// Ticks before an anomaly resolves; 0 keeps it until cleared by an update.
    pub anomaly_duration_ticks: u64,
    /// Readings kept per device (must be > 0).
    pub history_limit: usize,
    /// Ticks run at startup so histories are not empty (at most
    /// [`MAX_WARMUP_TICKS`]).
    pub warmup_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let sim = SimConfig::new(42);
        Self {
            fleet: "campus".to_string(),
            seed: sim.seed,
            tick_interval_ms: 2000,
            variation: sim.variation,
            anomaly_probability: sim.anomaly_probability,
            anomaly_duration_ticks: sim.anomaly_duration_ticks,
            history_limit: DEFAULT_HISTORY_LIMIT,
            warmup_ticks: 30,
        }
    }
}

/// Intervals used by `--watch` pollers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub devices_interval_secs: u64,
    pub analytics_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            devices_interval_secs: 5,
            analytics_interval_secs: 10,
        }
    }
}

impl PollingConfig {
    pub fn devices_interval(&self) -> Duration {
        Duration::from_secs(self.devices_interval_secs)
    }

    pub fn analytics_interval(&self) -> Duration {
        Duration::from_secs(self.analytics_interval_secs)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tick_interval_ms"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ServiceConfig {
    /// The default 21-device campus with occasional anomalies.
    pub fn campus() -> Self {
        Self::default()
    }

    /// Campus fleet that never develops anomalies.
    pub fn quiet() -> Self {
        Self {
            simulation: SimulationConfig {
                anomaly_probability: 0.0,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// No devices at all; every aggregate is zero.
    pub fn empty() -> Self {
        Self {
            simulation: SimulationConfig {
                fleet: "empty".to_string(),
                warmup_ticks: 0,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["campus", "quiet", "empty"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "campus" => Ok(Self::campus()),
            "quiet" => Ok(Self::quiet()),
            "empty" => Ok(Self::empty()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `server.bind` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.bind.parse().map_err(|_| {
            ConfigError::new(
                "server.bind",
                format!("\"{}\" is not an IP address", self.server.bind),
            )
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Fleet preset named by `simulation.fleet`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the name is unknown.
    pub fn fleet(&self) -> Result<Fleet, ConfigError> {
        Fleet::from_name(&self.simulation.fleet).ok_or_else(|| {
            ConfigError::new(
                "simulation.fleet",
                format!(
                    "unknown fleet \"{}\", available: {}",
                    self.simulation.fleet,
                    Fleet::NAMES.join(", ")
                ),
            )
        })
    }

    /// Simulator dynamics for this configuration.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig {
            seed: s.seed,
            variation: s.variation,
            anomaly_probability: s.anomaly_probability,
            anomaly_duration_ticks: s.anomaly_duration_ticks,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.simulation.tick_interval_ms)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.socket_addr() {
            errors.push(e);
        }
        if self.server.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            errors.push(ConfigError::new("server.api_key", "must not be blank"));
        }

        let s = &self.simulation;
        if let Err(e) = self.fleet() {
            errors.push(e);
        }
        if s.tick_interval_ms == 0 {
            errors.push(ConfigError::new("simulation.tick_interval_ms", "must be > 0"));
        }
        if !(0.0..1.0).contains(&s.variation) {
            errors.push(ConfigError::new("simulation.variation", "must be in [0.0, 1.0)"));
        }
        if !(0.0..=1.0).contains(&s.anomaly_probability) {
            errors.push(ConfigError::new(
                "simulation.anomaly_probability",
                "must be in [0.0, 1.0]",
            ));
        }
        if s.history_limit == 0 {
            errors.push(ConfigError::new("simulation.history_limit", "must be > 0"));
        }
        if s.warmup_ticks > MAX_WARMUP_TICKS {
            errors.push(ConfigError::new(
                "simulation.warmup_ticks",
                format!("must be <= {MAX_WARMUP_TICKS}"),
            ));
        }

        let t = &self.tariff;
        if !(t.cost_per_kwh.is_finite() && t.cost_per_kwh >= 0.0) {
            errors.push(ConfigError::new("tariff.cost_per_kwh", "must be >= 0"));
        }
        if !(t.co2_kg_per_kwh.is_finite() && t.co2_kg_per_kwh >= 0.0) {
            errors.push(ConfigError::new("tariff.co2_kg_per_kwh", "must be >= 0"));
        }

        let p = &self.polling;
        if p.devices_interval_secs == 0 {
            errors.push(ConfigError::new("polling.devices_interval_secs", "must be > 0"));
        }
        if p.analytics_interval_secs == 0 {
            errors.push(ConfigError::new("polling.analytics_interval_secs", "must be > 0"));
        }

        errors
    }
}
