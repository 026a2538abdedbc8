/// Tick counter for the telemetry simulator.
///
/// The live service never stops ticking; finite runs (warm-up, tests) bound
/// the clock with [`TickClock::bounded`].
///
/// # Examples
///
/// ```
/// use campus_energy::sim::clock::TickClock;
///
/// let mut clock = TickClock::bounded(3);
/// let mut ticks = Vec::new();
///
/// clock.run(|tick| ticks.push(tick));
/// assert_eq!(ticks, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Next tick to hand out
    current: u64,
    /// Tick at which the clock stops, if any
    limit: Option<u64>,
}

impl TickClock {
    /// Creates a clock that never runs out.
    pub fn unbounded() -> Self {
        Self {
            current: 0,
            limit: None,
        }
    }

    /// Creates a clock that hands out exactly `total` ticks.
    pub fn bounded(total: u64) -> Self {
        Self {
            current: 0,
            limit: Some(total),
        }
    }

    /// Number of ticks handed out so far.
    pub fn elapsed(&self) -> u64 {
        self.current
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The tick number (starting from 0) before advancing
    /// * `None` - If a bounded clock has reached its limit
    pub fn tick(&mut self) -> Option<u64> {
        if self.limit.is_some_and(|limit| self.current >= limit) {
            return None;
        }
        let tick = self.current;
        self.current += 1;
        Some(tick)
    }

    /// Runs a function for each remaining tick.
    ///
    /// On an unbounded clock this never returns.
    pub fn run(&mut self, mut f: impl FnMut(u64)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick() {
        let mut clock = TickClock::bounded(2);
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.elapsed(), 2);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = TickClock::bounded(0);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }

    #[test]
    fn test_unbounded_keeps_going() {
        let mut clock = TickClock::unbounded();
        for expected in 0..100 {
            assert_eq!(clock.tick(), Some(expected));
        }
    }
}
