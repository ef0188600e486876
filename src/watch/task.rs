//! One polling task: tick, fetch, diff, report, repeat.
//!
//! # Tick Flow
//!
//! 1. Wait for the next tick (or for cancellation)
//! 2. Stop with [`WatchExit::LimitReached`] once `limit` polls have run
//! 3. `GET` the resource through the shared [`ApiClient`]
//! 4. Decode the body as a JSON object
//! 5. Copy changed baseline fields; stop on a missing baseline key
//! 6. Call the callback if anything changed; a panicking callback stops the task
//!
//! Ticks of one task never overlap: the loop awaits each poll before waiting for the
//! next tick, and a late poll delays the schedule instead of bunching ticks up.

use super::diff::{self, ComparePolicy};
use super::registry::WatchId;
use crate::client::ErrorReporter;
use crate::error::{ApiError, Result};
use crate::protocol::constants::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::types::{json_kind, Response, Snapshot};
use crate::ApiClient;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Callback invoked with the updated baseline after a poll that changed it.
pub type ChangeCallback = Box<dyn FnMut(&Snapshot) + Send + 'static>;

/// Scheduling and comparison options for one watch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Delay between polls. The first poll happens one interval after registration.
    pub interval: Duration,
    /// Number of polls after which the task stops; `0` means unlimited.
    pub limit: u64,
    /// Value comparison policy.
    pub compare: ComparePolicy,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            interval: DEFAULT_POLL_INTERVAL,
            limit: 0,
            compare: ComparePolicy::Strict,
        }
    }
}

impl WatchOptions {
    /// Default options: one second interval, unlimited, strict comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the poll interval in milliseconds.
    pub fn interval_ms(self, millis: u64) -> Self {
        self.interval(Duration::from_millis(millis))
    }

    /// Set the poll limit (`0` = unlimited).
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the comparison policy.
    pub fn compare(mut self, compare: ComparePolicy) -> Self {
        self.compare = compare;
        self
    }
}

/// Lifecycle state of a watch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    /// Polling.
    Active,
    /// Stopped after reaching its poll limit.
    Completed,
    /// Stopped by `cancel`, `dispose` or dropping the watcher.
    Cancelled,
    /// Stopped by a fatal error.
    Failed(ApiError),
}

impl WatchState {
    /// Whether the task is still polling.
    pub fn is_active(&self) -> bool {
        matches!(self, WatchState::Active)
    }

    /// The outcome of a stopped task, or `None` while it is still polling.
    pub(crate) fn outcome(&self) -> Option<Result<WatchExit>> {
        match self {
            WatchState::Active => None,
            WatchState::Completed => Some(Ok(WatchExit::LimitReached)),
            WatchState::Cancelled => Some(Ok(WatchExit::Cancelled)),
            WatchState::Failed(err) => Some(Err(err.clone())),
        }
    }
}

/// Why a watch task stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The poll limit was reached.
    LimitReached,
    /// The task was cancelled.
    Cancelled,
}

/// Status shared between a running task and its registry record.
///
/// The state lives in a `watch` channel so any number of waiters can observe the
/// transition out of `Active`.
pub(crate) struct TaskStatus {
    pub(crate) iterations: AtomicU64,
    state: watch::Sender<WatchState>,
    latest: Mutex<Snapshot>,
}

impl TaskStatus {
    pub(crate) fn new(baseline: Snapshot) -> Self {
        let (state, _) = watch::channel(WatchState::Active);
        TaskStatus {
            iterations: AtomicU64::new(0),
            state,
            latest: Mutex::new(baseline),
        }
    }

    pub(crate) fn state(&self) -> WatchState {
        self.state.borrow().clone()
    }

    pub(crate) fn set_state(&self, state: WatchState) {
        self.state.send_replace(state);
    }

    /// Resolve once the task has stopped, with its outcome.
    pub(crate) async fn stopped(&self) -> Result<WatchExit> {
        let mut state = self.state.subscribe();
        // the sender lives in `self`, so the channel cannot close while we wait
        let outcome = state
            .wait_for(|s| !s.is_active())
            .await
            .ok()
            .and_then(|settled| settled.outcome());
        outcome.unwrap_or_else(|| Err(ApiError::WatchAborted("state channel closed".into())))
    }

    pub(crate) fn latest(&self) -> Snapshot {
        self.latest.lock().clone()
    }
}

pub(crate) struct WatchTask {
    pub(crate) id: WatchId,
    pub(crate) api: ApiClient,
    pub(crate) baseline: Snapshot,
    pub(crate) callback: ChangeCallback,
    pub(crate) options: WatchOptions,
    pub(crate) status: Arc<TaskStatus>,
    pub(crate) cancel: CancellationToken,
    pub(crate) reporter: Arc<dyn ErrorReporter>,
}

impl WatchTask {
    pub(crate) async fn run(mut self) {
        let logging = self.api.config().enable_logging;
        if logging {
            tracing::info!(
                watch = %self.id,
                url = %self.api.url(),
                interval_ms = self.options.interval.as_millis() as u64,
                limit = self.options.limit,
                "watch started"
            );
        }

        let result = self.poll_loop(logging).await;

        let state = match &result {
            Ok(WatchExit::LimitReached) => WatchState::Completed,
            Ok(WatchExit::Cancelled) => WatchState::Cancelled,
            Err(e) => WatchState::Failed(e.clone()),
        };
        if logging {
            tracing::info!(watch = %self.id, state = ?state, "watch stopped");
        }
        self.status.set_state(state);
    }

    async fn poll_loop(&mut self, logging: bool) -> Result<WatchExit> {
        let period = self.options.interval.max(MIN_POLL_INTERVAL);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut iterations = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(WatchExit::Cancelled),
                _ = ticker.tick() => {}
            }

            if self.options.limit != 0 && iterations >= self.options.limit {
                return Ok(WatchExit::LimitReached);
            }
            iterations += 1;
            self.status.iterations.store(iterations, Ordering::Release);

            match self.poll_once().await {
                Ok(changed) if changed.is_empty() => {}
                Ok(changed) => {
                    if logging {
                        tracing::debug!(watch = %self.id, fields = ?changed, "remote record changed");
                    }
                    *self.status.latest.lock() = self.baseline.clone();
                    let notify = AssertUnwindSafe(|| (self.callback)(&self.baseline));
                    if let Err(payload) = panic::catch_unwind(notify) {
                        let err = ApiError::WatchAborted(format!(
                            "change callback panicked: {}",
                            panic_message(payload.as_ref())
                        ));
                        self.reporter.report(&err);
                        return Err(err);
                    }
                }
                Err(e) if e.is_fatal_for_watch() => {
                    self.reporter.report(&e);
                    return Err(e);
                }
                Err(e) => {
                    // the client already reported transport failures
                    if !e.is_transport() {
                        self.reporter.report(&e);
                    }
                    if logging {
                        tracing::warn!(watch = %self.id, iteration = iterations, "poll failed: {}", e);
                    }
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Result<Vec<String>> {
        let response = self.api.get().await?;
        let remote = decode_record(&response)?;
        diff::apply_remote(&mut self.baseline, &remote, self.options.compare)
    }
}

// Unwinding through the runtime or dropping the future mid-poll must not leave the
// record looking active.
impl Drop for WatchTask {
    fn drop(&mut self) {
        if self.status.state().is_active() {
            self.status.set_state(WatchState::Failed(ApiError::WatchAborted(format!(
                "{} stopped before finishing",
                self.id
            ))));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

fn decode_record(response: &Response) -> Result<Snapshot> {
    match response.json::<serde_json::Value>()? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialization(format!(
            "expected a JSON object from the watched resource, got {}",
            json_kind(&other)
        ))),
    }
}
