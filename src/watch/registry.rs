//! Registry of watch tasks owned by one [`Watcher`](super::Watcher).
//!
//! Each record keeps the task's shared status and its cancellation token. Records
//! outlive their tasks: a finished task stays listed (with its final
//! state) until it is removed with `dispose` or `prune`.

use super::task::{TaskStatus, WatchState};
use crate::types::Snapshot;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Identifier of a watch task, unique within its watcher and increasing with creation
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub(crate) u64);

impl WatchId {
    /// The numeric value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Point-in-time view of one registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchInfo {
    /// Task id.
    pub id: WatchId,
    /// Polls started so far.
    pub iterations: u64,
    /// Poll cap; `0` means unlimited.
    pub limit: u64,
    /// Delay between polls.
    pub interval: Duration,
    /// Lifecycle state.
    pub state: WatchState,
}

pub(crate) struct WatchEntry {
    pub(crate) status: Arc<TaskStatus>,
    pub(crate) cancel: CancellationToken,
    pub(crate) limit: u64,
    pub(crate) interval: Duration,
}

impl WatchEntry {
    fn info(&self, id: WatchId) -> WatchInfo {
        WatchInfo {
            id,
            iterations: self.status.iterations.load(Ordering::Acquire),
            limit: self.limit,
            interval: self.interval,
            state: self.status.state(),
        }
    }
}

#[derive(Default)]
pub(crate) struct WatchRegistry {
    tasks: RwLock<BTreeMap<WatchId, WatchEntry>>,
}

impl WatchRegistry {
    pub(crate) fn insert(&self, id: WatchId, entry: WatchEntry) {
        self.tasks.write().insert(id, entry);
    }

    /// Signal the task to stop before its next tick. Returns `false` if the id is unknown
    /// or the task already stopped.
    pub(crate) fn cancel(&self, id: WatchId) -> bool {
        let tasks = self.tasks.read();
        match tasks.get(&id) {
            Some(entry) if entry.status.state().is_active() && !entry.cancel.is_cancelled() => {
                entry.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn cancel_all(&self) -> usize {
        let tasks = self.tasks.read();
        let mut cancelled = 0;
        for entry in tasks.values() {
            if entry.status.state().is_active() && !entry.cancel.is_cancelled() {
                entry.cancel.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel the task and drop its record.
    pub(crate) fn remove(&self, id: WatchId) -> Option<WatchInfo> {
        let entry = self.tasks.write().remove(&id)?;
        entry.cancel.cancel();
        Some(entry.info(id))
    }

    /// Drop the records of every task that is no longer active.
    pub(crate) fn prune(&self) -> usize {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, entry| entry.status.state().is_active());
        before - tasks.len()
    }

    pub(crate) fn info(&self, id: WatchId) -> Option<WatchInfo> {
        self.tasks.read().get(&id).map(|entry| entry.info(id))
    }

    pub(crate) fn snapshot(&self, id: WatchId) -> Option<Snapshot> {
        self.tasks.read().get(&id).map(|entry| entry.status.latest())
    }

    pub(crate) fn ids(&self) -> Vec<WatchId> {
        self.tasks.read().keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.tasks
            .read()
            .values()
            .filter(|entry| entry.status.state().is_active())
            .count()
    }

    /// Shared status of a task, for awaiting it outside the lock.
    pub(crate) fn status(&self, id: WatchId) -> Option<Arc<TaskStatus>> {
        self.tasks.read().get(&id).map(|entry| Arc::clone(&entry.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    fn entry(state: WatchState) -> WatchEntry {
        let mut baseline = Snapshot::new();
        baseline.insert("id".into(), json!(1));
        let status = Arc::new(TaskStatus::new(baseline));
        status.set_state(state);
        WatchEntry {
            status,
            cancel: CancellationToken::new(),
            limit: 3,
            interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_info_and_snapshot() {
        let registry = WatchRegistry::default();
        registry.insert(WatchId(1), entry(WatchState::Active));

        let info = registry.info(WatchId(1)).unwrap();
        assert_eq!(info.limit, 3);
        assert_eq!(info.iterations, 0);
        assert_eq!(info.state, WatchState::Active);
        assert_eq!(registry.snapshot(WatchId(1)).unwrap()["id"], 1);
        assert!(registry.info(WatchId(2)).is_none());
    }

    #[test]
    fn test_cancel_only_active_tasks() {
        let registry = WatchRegistry::default();
        registry.insert(WatchId(1), entry(WatchState::Active));
        registry.insert(WatchId(2), entry(WatchState::Completed));

        assert!(registry.cancel(WatchId(1)));
        assert!(!registry.cancel(WatchId(1)));
        assert!(!registry.cancel(WatchId(2)));
        assert!(!registry.cancel(WatchId(9)));
    }

    #[test]
    fn test_prune_keeps_active_records() {
        let registry = WatchRegistry::default();
        registry.insert(WatchId(1), entry(WatchState::Active));
        registry.insert(WatchId(2), entry(WatchState::Cancelled));
        registry.insert(
            WatchId(3),
            entry(WatchState::Failed(ApiError::KeyCompatibility { key: "id".into() })),
        );

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.prune(), 2);
        assert_eq!(registry.ids(), vec![WatchId(1)]);
    }

    #[test]
    fn test_remove_cancels() {
        let registry = WatchRegistry::default();
        let e = entry(WatchState::Active);
        let token = e.cancel.clone();
        registry.insert(WatchId(4), e);

        let info = registry.remove(WatchId(4)).unwrap();
        assert_eq!(info.id, WatchId(4));
        assert!(token.is_cancelled());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(WatchId(7).to_string(), "watch-7");
        assert!(WatchId(1) < WatchId(2));
    }
}
