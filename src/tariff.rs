use serde::{Deserialize, Serialize};

/// Fixed energy price and emission factor applied to every consumption figure.
///
/// Figures are per kWh; device draw is in watts, so callers divide by 1000
/// before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tariff {
    /// Price per kWh in dollars.
    pub cost_per_kwh: f64,
    /// Kilograms of CO2 emitted per kWh.
    pub co2_kg_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            cost_per_kwh: 0.12,
            co2_kg_per_kwh: 0.5,
        }
    }
}

impl Tariff {
    /// Cost of drawing `watts` for one hour.
    pub fn hourly_cost(&self, watts: f64) -> f64 {
        watts / 1000.0 * self.cost_per_kwh
    }

    /// CO2 (kg) emitted by drawing `watts` for one hour.
    pub fn hourly_co2(&self, watts: f64) -> f64 {
        watts / 1000.0 * self.co2_kg_per_kwh
    }
}
