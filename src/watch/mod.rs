//! Polling change watcher.
//!
//! A [`Watcher`] repeatedly `GET`s the URL of its [`ApiClient`], compares each fetched
//! JSON object with a locally held baseline and reports the fields that changed.
//!
//! # Module Organization
//!
//! ```text
//! watch/
//! ├── diff     - Baseline vs. remote comparison
//! ├── task     - The per-task polling loop and its options/states
//! ├── registry - Records of the tasks owned by one watcher
//! └── stream   - Stream adapter over the change callback
//! ```
//!
//! # Semantics
//!
//! - Only keys present in the baseline are watched; new remote keys are ignored.
//! - The baseline is updated in place and handed to the callback after every poll that
//!   changed at least one field.
//! - A baseline key missing from the remote object stops the task with
//!   [`ApiError::KeyCompatibility`](crate::ApiError::KeyCompatibility).
//! - Transport failures and undecodable bodies are reported; polling goes on.
//! - Finished tasks keep their record until [`Watcher::dispose`] or [`Watcher::prune`].
//!
//! # Examples
//!
//! ```ignore
//! use pollwatch_http::{to_snapshot, ApiClient, Watcher, WatchOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> pollwatch_http::Result<()> {
//!     let watcher = Watcher::new(ApiClient::new("http://example.com/api/job/7"));
//!     let baseline = to_snapshot(&json!({ "state": "queued", "progress": 0 }))?;
//!
//!     let id = watcher.watch_with(
//!         baseline,
//!         |job| println!("job changed: {job:?}"),
//!         WatchOptions::new().interval_ms(500).limit(20),
//!     );
//!     watcher.wait(id).await?;
//!     Ok(())
//! }
//! ```

mod diff;
mod registry;
mod stream;
mod task;

pub use diff::{apply_remote, ComparePolicy};
pub use registry::{WatchId, WatchInfo};
pub use stream::ChangeStream;
pub use task::{ChangeCallback, WatchExit, WatchOptions, WatchState};

use crate::error::{ApiError, Result};
use crate::types::Snapshot;
use crate::ApiClient;
use registry::{WatchEntry, WatchRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use task::{TaskStatus, WatchTask};
use tokio_util::sync::CancellationToken;

/// Owner of a set of polling tasks against one [`ApiClient`].
///
/// Tasks run on the Tokio runtime, so registering one requires a runtime context.
/// Dropping the watcher cancels every task it owns.
pub struct Watcher {
    api: ApiClient,
    registry: WatchRegistry,
    next_id: AtomicU64,
}

impl Watcher {
    /// Create a watcher polling through `api`.
    ///
    /// `api` shares its settings with the caller's handle, so header or option changes
    /// made later apply to subsequent polls.
    pub fn new(api: ApiClient) -> Self {
        Watcher {
            api,
            registry: WatchRegistry::default(),
            next_id: AtomicU64::new(1),
        }
    }

    /// The client used for polling.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Default options for this watcher: the configured poll interval, no limit, strict
    /// comparison.
    pub fn default_options(&self) -> WatchOptions {
        WatchOptions::default().interval(self.api.config().poll_interval())
    }

    /// Watch with the default options.
    pub fn watch<F>(&self, baseline: Snapshot, callback: F) -> WatchId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        self.watch_with(baseline, callback, self.default_options())
    }

    /// Register a polling task and return its id immediately.
    ///
    /// `callback` runs after each poll that changed the baseline, with the updated
    /// baseline.
    pub fn watch_with<F>(&self, baseline: Snapshot, callback: F, options: WatchOptions) -> WatchId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        self.spawn(baseline, Box::new(callback), options)
    }

    /// Register a polling task whose changes are delivered as a stream.
    pub fn watch_stream(&self, baseline: Snapshot, options: WatchOptions) -> (WatchId, ChangeStream) {
        let (callback, stream) = ChangeStream::channel();
        (self.spawn(baseline, callback, options), stream)
    }

    fn spawn(&self, baseline: Snapshot, callback: ChangeCallback, options: WatchOptions) -> WatchId {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let status = Arc::new(TaskStatus::new(baseline.clone()));
        let cancel = CancellationToken::new();

        let task = WatchTask {
            id,
            api: self.api.clone(),
            baseline,
            callback,
            options,
            status: Arc::clone(&status),
            cancel: cancel.clone(),
            reporter: self.api.reporter(),
        };
        self.registry.insert(
            id,
            WatchEntry {
                status,
                cancel,
                limit: options.limit,
                interval: options.interval,
            },
        );
        tokio::spawn(task.run());
        id
    }

    /// Stop a task before its next tick. A poll already in flight still completes.
    ///
    /// Returns `false` if the id is unknown or the task already stopped.
    pub fn cancel(&self, id: WatchId) -> bool {
        self.registry.cancel(id)
    }

    /// Cancel every active task. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Cancel a task and remove its record.
    pub fn dispose(&self, id: WatchId) -> Option<WatchInfo> {
        self.registry.remove(id)
    }

    /// Remove the records of all stopped tasks. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.registry.prune()
    }

    /// Current view of a task.
    pub fn info(&self, id: WatchId) -> Option<WatchInfo> {
        self.registry.info(id)
    }

    /// The task's baseline as of its last change.
    pub fn snapshot(&self, id: WatchId) -> Option<Snapshot> {
        self.registry.snapshot(id)
    }

    /// Ids of every registered task, oldest first.
    pub fn ids(&self) -> Vec<WatchId> {
        self.registry.ids()
    }

    /// Number of registered tasks, stopped ones included.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no task is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks still polling.
    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Wait for a task to stop.
    ///
    /// Returns the exit reason, or the error that stopped the task. Any number of callers
    /// may wait on the same task, and dropping a pending `wait` has no effect on it.
    pub async fn wait(&self, id: WatchId) -> Result<WatchExit> {
        let status = self
            .registry
            .status(id)
            .ok_or(ApiError::WatchNotFound(id.as_u64()))?;
        status.stopped().await
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("url", &self.api.url())
            .field("tasks", &self.registry.len())
            .finish()
    }
}
