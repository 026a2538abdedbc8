//! Background task that drives the simulator on a fixed interval.

use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::engine::Simulator;
use super::types::TickSummary;

/// Handle to a running simulator task.
///
/// Dropping the handle stops the task.
pub struct TickerHandle {
    task: JoinHandle<()>,
    summaries: watch::Receiver<TickSummary>,
}

impl TickerHandle {
    /// A receiver that always holds the latest tick summary.
    pub fn subscribe(&self) -> watch::Receiver<TickSummary> {
        self.summaries.clone()
    }

    /// Stops the simulator task.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Moves `sim` into a task that ticks it every `period`.
///
/// The first tick happens one period after spawning. Late ticks are delayed
/// rather than bunched up.
pub fn spawn_ticker(mut sim: Simulator, period: Duration) -> TickerHandle {
    let period = period.max(Duration::from_millis(1));
    let (tx, rx) = watch::channel(TickSummary::default());

    let task = tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` fires immediately once; that slot is the spawn itself.
        interval.tick().await;
        info!(
            "simulator ticking every {period:?} over {} devices",
            sim.registry().len()
        );

        loop {
            interval.tick().await;
            let summary = sim.tick();
            if summary.anomalies_started > 0 || summary.anomalies_resolved > 0 {
                debug!("{summary}");
            }
            tx.send_replace(summary);
        }
    });

    TickerHandle {
        task,
        summaries: rx,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::devices::fixtures::device;
    use crate::devices::DeviceType;
    use crate::registry::DeviceRegistry;
    use crate::sim::types::SimConfig;
    use crate::tariff::Tariff;

    fn registry() -> Arc<DeviceRegistry> {
        Arc::new(DeviceRegistry::new(
            vec![device("dev-001", "Building A", DeviceType::Computer, 300.0)],
            100,
            Tariff::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_schedule() {
        let registry = registry();
        let sim = Simulator::new(Arc::clone(&registry), SimConfig::new(1));
        let handle = spawn_ticker(sim, Duration::from_secs(1));
        let rx = handle.subscribe();

        time::sleep(Duration::from_millis(3500)).await;

        let readings = registry.readings("dev-001", 100).unwrap();
        assert!(readings.len() >= 2, "only {} readings", readings.len());
        assert!(rx.borrow().tick >= 1);
        assert!(readings.iter().all(|r| r.timestamp <= Utc::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticking() {
        let registry = registry();
        let sim = Simulator::new(Arc::clone(&registry), SimConfig::new(1));
        let handle = spawn_ticker(sim, Duration::from_secs(1));

        time::sleep(Duration::from_millis(2500)).await;
        handle.shutdown();
        let frozen = registry.readings("dev-001", 100).unwrap().len();

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(registry.readings("dev-001", 100).unwrap().len(), frozen);
    }
}
