//! In-memory correlation store.
//!
//! Single source of truth for in-flight work. Every operation takes the one
//! store lock, so no two callers can race on an entry's transition. The lock
//! is never held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::model::{Completion, RequestId, State, StoreCounts, Task, WorkItem};

/// Owns every work item. Other components refer to entries by id only.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    items: Mutex<HashMap<RequestId, WorkItem>>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, WorkItem>> {
        // Every critical section leaves the map consistent, so a panic in
        // another holder does not invalidate it.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a pending entry under a fresh id and return the id.
    pub fn create(&self, task: Task) -> RequestId {
        let mut items = self.lock();
        let mut id = RequestId::new();
        while items.contains_key(&id) {
            id = RequestId::new();
        }
        items.insert(id, WorkItem::pending(id, task));
        id
    }

    /// Attach a result to a pending entry.
    ///
    /// Returns `false` when the id is unknown, already removed, or already
    /// completed. Callers must treat that as an anomaly.
    pub fn complete(&self, id: RequestId, completion: Completion) -> bool {
        let mut items = self.lock();
        match items.get_mut(&id) {
            Some(item) if item.state.can_transition_to(State::Completed) => {
                item.state = State::Completed;
                item.result = Some(completion);
                true
            }
            _ => false,
        }
    }

    /// Remove a completed entry and hand back its result. No side effects
    /// unless the entry is completed.
    pub fn try_take_completed(&self, id: RequestId) -> Option<Completion> {
        let mut items = self.lock();
        if items.get(&id)?.state != State::Completed {
            return None;
        }
        items.remove(&id).and_then(|item| item.result)
    }

    /// Remove an entry in whatever state it is in. Idempotent.
    pub fn remove(&self, id: RequestId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Copy of the entry, for inspection.
    pub fn get(&self, id: RequestId) -> Option<WorkItem> {
        self.lock().get(&id).cloned()
    }

    pub fn count_pending(&self) -> usize {
        self.counts().pending
    }

    pub fn count_completed_unclaimed(&self) -> usize {
        self.counts().completed
    }

    /// Both counts from a single lock acquisition.
    pub fn counts(&self) -> StoreCounts {
        self.lock()
            .values()
            .fold(StoreCounts::default(), |mut counts, item| {
                match item.state {
                    State::Pending => counts.pending += 1,
                    State::Completed => counts.completed += 1,
                }
                counts
            })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry older than `max_age`. Returns how many went.
    pub fn sweep(&self, max_age: Duration) -> usize {
        // Ages beyond chrono's range can't have elapsed yet
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };

        let mut items = self.lock();
        let before = items.len();
        items.retain(|_, item| item.created_at > cutoff);
        before - items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new("claude", "What is 2+2?")
    }

    #[test]
    fn completed_entry_is_taken_once() {
        let store = CorrelationStore::new();
        let id = store.create(task());

        assert!(store.complete(id, Completion::new("4")));
        assert_eq!(store.try_take_completed(id), Some(Completion::new("4")));
        assert_eq!(store.try_take_completed(id), None);
        assert!(store.is_empty());
    }

    #[test]
    fn second_completion_is_rejected() {
        let store = CorrelationStore::new();
        let id = store.create(task());

        assert!(store.complete(id, Completion::new("first")));
        assert!(!store.complete(id, Completion::new("second")));
        assert_eq!(
            store.try_take_completed(id).map(|c| c.result),
            Some("first".to_string())
        );
    }

    #[test]
    fn sweep_keeps_fresh_entries() {
        let store = CorrelationStore::new();
        store.create(task());

        assert_eq!(store.sweep(Duration::from_secs(60)), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_with_zero_age_clears_everything() {
        let store = CorrelationStore::new();
        let pending = store.create(task());
        let done = store.create(task());
        store.complete(done, Completion::new("x"));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.sweep(Duration::ZERO), 2);
        assert!(!store.contains(pending));
        assert!(!store.contains(done));
    }
}
