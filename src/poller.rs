//! Repeating snapshot fetches for dashboard clients.
//!
//! A [`Poller`] issues a fetch immediately and then once per interval.
//! Fetches may overlap; each carries the sequence number it was issued with
//! and a response is only applied if no later-issued fetch has already been
//! applied. Dropping the [`PollHandle`] aborts the timer and every in-flight
//! fetch, so nothing writes to the state after teardown.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use crate::api::ApiResponse;

/// Default interval for device snapshots.
pub const DEVICES_INTERVAL: Duration = Duration::from_secs(5);
/// Default interval for analytics snapshots.
pub const ANALYTICS_INTERVAL: Duration = Duration::from_secs(10);
/// Per-request timeout for [`HttpSource`].
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("server reported failure: {0}")]
    Api(String),
    #[error("fetch task failed: {0}")]
    Join(String),
}

/// Something that can produce a fresh snapshot on demand.
pub trait SnapshotSource: Send + Sync + 'static {
    type Snapshot: Send + Sync + 'static;

    fn fetch(&self) -> impl Future<Output = Result<Self::Snapshot, PollError>> + Send;
}

/// Fetches `{success, data}` envelopes from one endpoint of the API.
pub struct HttpSource<T> {
    url: String,
    timeout: Duration,
    _snapshot: PhantomData<fn() -> T>,
}

impl<T> HttpSource<T> {
    /// `base_url` like `http://127.0.0.1:3000`, `path` like `/realtime/devices`.
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            timeout: HTTP_TIMEOUT,
            _snapshot: PhantomData,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<T: DeserializeOwned + Send + Sync + 'static> SnapshotSource for HttpSource<T> {
    type Snapshot = T;

    fn fetch(&self) -> impl Future<Output = Result<T, PollError>> + Send {
        let url = self.url.clone();
        let timeout = self.timeout;
        async move {
            tokio::task::spawn_blocking(move || get_envelope(&url, timeout))
                .await
                .map_err(|e| PollError::Join(e.to_string()))?
        }
    }
}

fn get_envelope<T: DeserializeOwned>(url: &str, timeout: Duration) -> Result<T, PollError> {
    match ureq::get(url).timeout(timeout).call() {
        Ok(response) => {
            let envelope: ApiResponse<T> = response
                .into_json()
                .map_err(|e| PollError::Decode(e.to_string()))?;
            if !envelope.success {
                return Err(PollError::Api(
                    envelope.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
            envelope
                .data
                .ok_or_else(|| PollError::Decode("envelope has no data".to_string()))
        }
        Err(ureq::Error::Status(code, response)) => {
            let status_text = response.status_text().to_string();
            let message = response
                .into_json::<ApiResponse<serde_json::Value>>()
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or(status_text);
            Err(PollError::Status { code, message })
        }
        Err(ureq::Error::Transport(err)) => Err(PollError::Transport(err.to_string())),
    }
}

/// What a poller has seen so far.
#[derive(Debug, Clone, PartialEq)]
pub struct PollState<T> {
    /// Latest applied snapshot; kept when a later fetch fails.
    pub data: Option<T>,
    /// Error from the latest applied fetch, if it failed.
    pub error: Option<PollError>,
    /// True until the first fetch has been applied.
    pub loading: bool,
    /// When `data` was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: true,
            updated_at: None,
        }
    }
}

/// Handle to a running poller. Dropping it stops polling.
pub struct PollHandle<T> {
    task: JoinHandle<()>,
    state: watch::Receiver<PollState<T>>,
}

impl<T: Clone> PollHandle<T> {
    pub fn snapshot(&self) -> PollState<T> {
        self.state.borrow().clone()
    }
}

impl<T> PollHandle<T> {
    /// Waits until the state changes. Returns `false` once the poller has stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Stops the timer and aborts in-flight fetches.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns pollers onto the current tokio runtime.
pub struct Poller;

impl Poller {
    /// Polls `source` every `interval`, starting now. `label` tags log lines.
    pub fn spawn<S: SnapshotSource>(
        label: impl Into<String>,
        source: S,
        interval: Duration,
    ) -> PollHandle<S::Snapshot> {
        let label = label.into();
        let interval = interval.max(Duration::from_millis(1));
        let (tx, rx) = watch::channel(PollState::default());

        let task = tokio::spawn(async move {
            let source = Arc::new(source);
            // Owned here so aborting this task aborts every fetch with it.
            let mut in_flight = JoinSet::new();
            let mut next_seq: u64 = 0;
            let mut applied: Option<u64> = None;

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let seq = next_seq;
                        next_seq += 1;
                        let source = Arc::clone(&source);
                        in_flight.spawn(async move { (seq, source.fetch().await) });
                    }
                    Some(joined) = in_flight.join_next() => match joined {
                        Ok((seq, result)) => {
                            if applied.is_some_and(|last| seq <= last) {
                                debug!("{label}: discarding stale response #{seq}");
                                continue;
                            }
                            applied = Some(seq);
                            apply(&tx, &label, result);
                        }
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => apply(&tx, &label, Err(PollError::Join(e.to_string()))),
                    },
                }
            }
        });

        PollHandle { task, state: rx }
    }
}

fn apply<T>(tx: &watch::Sender<PollState<T>>, label: &str, result: Result<T, PollError>) {
    tx.send_modify(|state| {
        state.loading = false;
        match result {
            Ok(data) => {
                state.data = Some(data);
                state.error = None;
                state.updated_at = Some(Utc::now());
            }
            Err(e) => {
                warn!("{label}: fetch failed: {e}");
                state.error = Some(e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Step = (Duration, Result<&'static str, PollError>);

    /// Replays scripted responses; once the script runs out every fetch hangs.
    struct Scripted {
        steps: Mutex<VecDeque<Step>>,
        calls: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: Arc::new(AtomicUsize::new(0)),
                finished: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SnapshotSource for Scripted {
        type Snapshot = &'static str;

        fn fetch(&self) -> impl Future<Output = Result<&'static str, PollError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            let finished = Arc::clone(&self.finished);
            async move {
                let (delay, result) = step.unwrap_or((Duration::from_secs(3600), Ok("idle")));
                time::sleep(delay).await;
                finished.fetch_add(1, Ordering::SeqCst);
                result
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_is_immediate() {
        let source = Scripted::new(vec![(Duration::ZERO, Ok("first"))]);
        let mut handle = Poller::spawn("test", source, Duration::from_secs(5));
        assert!(handle.snapshot().loading);

        assert!(handle.changed().await);
        let state = handle.snapshot();
        assert!(!state.loading);
        assert_eq!(state.data, Some("first"));
        assert!(state.error.is_none());
        assert!(state.updated_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_responses_are_ignored() {
        let source = Scripted::new(vec![
            (Duration::from_secs(3), Ok("old")),
            (Duration::ZERO, Ok("new")),
        ]);
        let handle = Poller::spawn("test", source, Duration::from_secs(1));

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().data, Some("new"));

        // The first request lands at t=3s, after the second was applied.
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().data, Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_data() {
        let source = Scripted::new(vec![
            (Duration::ZERO, Ok("good")),
            (Duration::ZERO, Err(PollError::Transport("refused".to_string()))),
        ]);
        let handle = Poller::spawn("test", source, Duration::from_secs(1));

        time::sleep(Duration::from_millis(1500)).await;
        let state = handle.snapshot();
        assert_eq!(state.data, Some("good"));
        assert_eq!(state.error, Some(PollError::Transport("refused".to_string())));
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_error() {
        let source = Scripted::new(vec![
            (Duration::ZERO, Err(PollError::Api("Device not found".to_string()))),
            (Duration::ZERO, Ok("back")),
        ]);
        let handle = Poller::spawn("test", source, Duration::from_secs(1));

        time::sleep(Duration::from_millis(500)).await;
        assert!(handle.snapshot().error.is_some());
        assert_eq!(handle.snapshot().data, None);

        time::sleep(Duration::from_secs(1)).await;
        let state = handle.snapshot();
        assert_eq!(state.data, Some("back"));
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_timer_and_in_flight_fetches() {
        let source = Scripted::new(vec![(Duration::from_secs(2), Ok("slow"))]);
        let calls = Arc::clone(&source.calls);
        let finished = Arc::clone(&source.finished);
        let handle = Poller::spawn("test", source, Duration::from_secs(10));

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        handle.cancel();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn http_source_joins_url() {
        let source: HttpSource<u32> = HttpSource::new("http://localhost:3000/", "/health");
        assert_eq!(source.url(), "http://localhost:3000/health");
    }

    #[tokio::test]
    async fn http_source_reports_transport_errors() {
        // Port 9 on loopback is discard; nothing listens in test environments.
        let source: HttpSource<serde_json::Value> =
            HttpSource::new("http://127.0.0.1:9", "/devices").with_timeout(Duration::from_secs(2));
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, PollError::Transport(_)), "{err}");
    }
}
