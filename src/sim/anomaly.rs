/// A device anomaly spanning `[start_tick, start_tick + duration_ticks)`.
///
/// A zero duration never expires on its own; such an anomaly lasts until the
/// flag is cleared through a device update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyWindow {
    /// Tick the anomaly started on (inclusive).
    pub start_tick: u64,
    /// Number of ticks the anomaly lasts, or 0 for manual clearing only.
    pub duration_ticks: u64,
    /// Multiplier applied to the device's average draw while active.
    pub factor: f64,
}

impl AnomalyWindow {
    pub fn new(start_tick: u64, duration_ticks: u64, factor: f64) -> Self {
        Self {
            start_tick,
            duration_ticks,
            factor,
        }
    }

    /// Returns `true` when `tick` falls within the active window.
    pub fn is_active(&self, tick: u64) -> bool {
        if tick < self.start_tick {
            return false;
        }
        self.duration_ticks == 0 || tick < self.start_tick.saturating_add(self.duration_ticks)
    }

    /// The draw (W) a device with `average_watts` shows while the window is active.
    pub fn elevated_watts(&self, average_watts: f64) -> f64 {
        average_watts * self.factor
    }
}
