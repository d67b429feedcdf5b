//! Queue store service - per-queue ordering over the shared id space

use std::sync::Arc;

use requeue_domain::constants::DEFAULT_STRICT_MODE;
use requeue_domain::{Direction, QueueEntry, RequeueError, Result};
use tracing::debug;

use super::ports::EntryStore;

/// Ordering and identity layer for one named queue.
///
/// The store is stateless apart from its bound queue name and configuration;
/// every operation is a fresh round trip to the underlying [`EntryStore`].
/// Instances bound to the same store share one global id sequence, which is
/// what keeps per-queue ordering stable without a per-queue counter.
pub struct QueueStore {
    queue_name: String,
    store: Arc<dyn EntryStore>,
    strict: bool,
}

impl QueueStore {
    /// Create a queue store bound to `queue_name`.
    pub fn new(queue_name: impl Into<String>, store: Arc<dyn EntryStore>) -> Self {
        Self { queue_name: queue_name.into(), store, strict: DEFAULT_STRICT_MODE }
    }

    /// Configure strict payload validation.
    ///
    /// When enabled (the default), `push_entry` and `unshift_entry` reject
    /// payloads that are not JSON objects. When disabled, malformed payloads
    /// pass through and any failure comes from the storage layer.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The queue name this store is bound to.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Append `entry` to the logical end of the queue.
    ///
    /// Any caller-set id is stripped so the entry store assigns the next id
    /// in the global sequence.
    pub async fn push_entry(&self, mut entry: QueueEntry) -> Result<()> {
        self.validate(&entry)?;

        entry.id = None;
        entry.queue_name.clone_from(&self.queue_name);

        let id = self.store.add_entry(&entry).await?;
        debug!(queue_name = %self.queue_name, id, "entry appended");
        Ok(())
    }

    /// Insert `entry` at the logical front of the queue.
    ///
    /// The entry is assigned one less than the lowest id in the entire
    /// store, not just this queue, so ascending reads place it first even
    /// when another queue holds the current minimum. When the store is
    /// empty the id is left unset for auto-assignment.
    ///
    /// The read-minimum-then-insert pair is not atomic across concurrently
    /// racing instances; callers are expected to await each operation on an
    /// instance before issuing the next.
    pub async fn unshift_entry(&self, mut entry: QueueEntry) -> Result<()> {
        self.validate(&entry)?;

        entry.id = match self.store.first_entry().await? {
            Some(first) => first.id.map(|id| id - 1),
            None => None,
        };
        entry.queue_name.clone_from(&self.queue_name);

        let id = self.store.add_entry(&entry).await?;
        debug!(queue_name = %self.queue_name, id, "entry prepended");
        Ok(())
    }

    /// Remove and return the entry at the logical back of the queue.
    ///
    /// Returns `Ok(None)` when the queue has no entries.
    pub async fn pop_entry(&self) -> Result<Option<QueueEntry>> {
        self.remove_entry(Direction::Backward).await
    }

    /// Remove and return the entry at the logical front of the queue.
    ///
    /// Returns `Ok(None)` when the queue has no entries.
    pub async fn shift_entry(&self) -> Result<Option<QueueEntry>> {
        self.remove_entry(Direction::Forward).await
    }

    /// Read the entry at one end of the queue without removing it.
    pub async fn peek_entry(&self, direction: Direction) -> Result<Option<QueueEntry>> {
        self.store.end_entry(&self.queue_name, direction).await
    }

    /// Get every entry of this queue in ascending id order.
    pub async fn get_all(&self) -> Result<Vec<QueueEntry>> {
        self.store.all_entries(&self.queue_name).await
    }

    /// Count the entries of this queue.
    pub async fn size(&self) -> Result<usize> {
        self.store.count_entries(&self.queue_name).await
    }

    /// Delete the entry with the given global id.
    ///
    /// The id is NOT checked against this store's queue name: an id obtained
    /// from one queue can be deleted through a store bound to another. This
    /// primitive is not meant to be exposed to untrusted callers; callers
    /// that need ownership safety must look the entry up first.
    pub async fn delete_entry(&self, id: i64) -> Result<()> {
        self.store.delete_entry(id).await
    }

    /// Remove the end-most entry in the given traversal direction.
    async fn remove_entry(&self, direction: Direction) -> Result<Option<QueueEntry>> {
        let Some(entry) = self.store.end_entry(&self.queue_name, direction).await? else {
            return Ok(None);
        };

        if let Some(id) = entry.id {
            self.store.delete_entry(id).await?;
            debug!(queue_name = %self.queue_name, id, ?direction, "entry removed");
        }

        Ok(Some(entry))
    }

    fn validate(&self, entry: &QueueEntry) -> Result<()> {
        if self.strict && !entry.request_data.is_object() {
            return Err(RequeueError::InvalidInput(
                "request_data must be a structured JSON object".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// In-memory mock for `EntryStore`.
    ///
    /// A `BTreeMap` keyed by id models the store's ascending index; the
    /// high-water mark mimics an auto-increment sequence that never reuses
    /// an id after deletion.
    #[derive(Default)]
    struct MemoryEntryStore {
        inner: Mutex<MemoryState>,
    }

    #[derive(Default)]
    struct MemoryState {
        entries: BTreeMap<i64, QueueEntry>,
        high_water: i64,
    }

    #[async_trait]
    impl EntryStore for MemoryEntryStore {
        async fn add_entry(&self, entry: &QueueEntry) -> Result<i64> {
            let mut state = self.inner.lock().expect("mock lock");

            let id = match entry.id {
                Some(id) => {
                    if state.entries.contains_key(&id) {
                        return Err(RequeueError::Database(format!("id {id} occupied")));
                    }
                    id
                }
                None => state.high_water + 1,
            };

            state.high_water = state.high_water.max(id);
            let mut stored = entry.clone();
            stored.id = Some(id);
            state.entries.insert(id, stored);
            Ok(id)
        }

        async fn first_entry(&self) -> Result<Option<QueueEntry>> {
            let state = self.inner.lock().expect("mock lock");
            Ok(state.entries.values().next().cloned())
        }

        async fn end_entry(
            &self,
            queue_name: &str,
            direction: Direction,
        ) -> Result<Option<QueueEntry>> {
            let state = self.inner.lock().expect("mock lock");
            let mut matching = state.entries.values().filter(|e| e.queue_name == queue_name);
            Ok(match direction {
                Direction::Forward => matching.next().cloned(),
                Direction::Backward => matching.next_back().cloned(),
            })
        }

        async fn all_entries(&self, queue_name: &str) -> Result<Vec<QueueEntry>> {
            let state = self.inner.lock().expect("mock lock");
            Ok(state
                .entries
                .values()
                .filter(|e| e.queue_name == queue_name)
                .cloned()
                .collect())
        }

        async fn count_entries(&self, queue_name: &str) -> Result<usize> {
            let state = self.inner.lock().expect("mock lock");
            Ok(state.entries.values().filter(|e| e.queue_name == queue_name).count())
        }

        async fn delete_entry(&self, id: i64) -> Result<()> {
            let mut state = self.inner.lock().expect("mock lock");
            state.entries.remove(&id);
            Ok(())
        }
    }

    fn setup_queue(name: &str) -> (QueueStore, Arc<MemoryEntryStore>) {
        let store = Arc::new(MemoryEntryStore::default());
        (QueueStore::new(name, store.clone()), store)
    }

    fn request(url: &str) -> QueueEntry {
        QueueEntry::new(json!({"url": url, "method": "POST"}))
    }

    fn urls(entries: &[QueueEntry]) -> Vec<&str> {
        entries
            .iter()
            .filter_map(|e| e.request_data.get("url").and_then(|u| u.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn push_preserves_insertion_order() {
        let (queue, _store) = setup_queue("sync");

        for url in ["/a", "/b", "/c"] {
            queue.push_entry(request(url)).await.expect("push succeeds");
        }

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn unshift_reverses_call_order() {
        let (queue, _store) = setup_queue("sync");

        for url in ["/a", "/b", "/c"] {
            queue.unshift_entry(request(url)).await.expect("unshift succeeds");
        }

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/c", "/b", "/a"]);
    }

    #[tokio::test]
    async fn pop_removes_the_back() {
        let (queue, _store) = setup_queue("sync");

        for url in ["/a", "/b", "/c"] {
            queue.push_entry(request(url)).await.expect("push succeeds");
        }

        let popped = queue.pop_entry().await.expect("pop succeeds").expect("entry present");
        assert_eq!(popped.request_data["url"], "/c");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn shift_removes_the_front() {
        let (queue, _store) = setup_queue("sync");

        for url in ["/a", "/b"] {
            queue.push_entry(request(url)).await.expect("push succeeds");
        }

        let shifted = queue.shift_entry().await.expect("shift succeeds").expect("entry present");
        assert_eq!(shifted.request_data["url"], "/a");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/b"]);
    }

    #[tokio::test]
    async fn empty_queue_is_idempotent_on_removal() {
        let (queue, _store) = setup_queue("sync");

        for _ in 0..3 {
            assert!(queue.pop_entry().await.expect("pop succeeds").is_none());
            assert!(queue.shift_entry().await.expect("shift succeeds").is_none());
        }

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn mixed_scenario_matches_expected_order() {
        let (queue, _store) = setup_queue("q");

        queue.push_entry(request("/a")).await.expect("push /a");
        queue.push_entry(request("/b")).await.expect("push /b");
        queue.unshift_entry(request("/c")).await.expect("unshift /c");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/c", "/a", "/b"]);

        let popped = queue.pop_entry().await.expect("pop succeeds").expect("entry present");
        assert_eq!(popped.request_data["url"], "/b");

        let shifted = queue.shift_entry().await.expect("shift succeeds").expect("entry present");
        assert_eq!(shifted.request_data["url"], "/c");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(urls(&entries), vec!["/a"]);
    }

    #[tokio::test]
    async fn queues_are_isolated_despite_shared_ids() {
        let store = Arc::new(MemoryEntryStore::default());
        let queue_a = QueueStore::new("a", store.clone());
        let queue_b = QueueStore::new("b", store.clone());

        queue_a.push_entry(request("/a1")).await.expect("push a1");
        queue_b.push_entry(request("/b1")).await.expect("push b1");
        queue_a.push_entry(request("/a2")).await.expect("push a2");
        queue_b.unshift_entry(request("/b0")).await.expect("unshift b0");

        let a_entries = queue_a.get_all().await.expect("get_all a");
        assert_eq!(urls(&a_entries), vec!["/a1", "/a2"]);

        let b_entries = queue_b.get_all().await.expect("get_all b");
        assert_eq!(urls(&b_entries), vec!["/b0", "/b1"]);
    }

    #[tokio::test]
    async fn unshift_takes_global_minimum_across_queues() {
        let store = Arc::new(MemoryEntryStore::default());
        let queue_a = QueueStore::new("a", store.clone());
        let queue_b = QueueStore::new("b", store.clone());

        queue_a.push_entry(request("/a1")).await.expect("push a1");
        queue_b.unshift_entry(request("/b1")).await.expect("unshift b1");
        queue_a.unshift_entry(request("/a0")).await.expect("unshift a0");

        // a0's id must undercut b1's, which already undercut a1's.
        let a_entries = queue_a.get_all().await.expect("get_all a");
        let b_entries = queue_b.get_all().await.expect("get_all b");
        assert!(a_entries[0].id < b_entries[0].id);
        assert_eq!(urls(&a_entries), vec!["/a0", "/a1"]);
    }

    #[tokio::test]
    async fn delete_entry_ignores_queue_ownership() {
        let store = Arc::new(MemoryEntryStore::default());
        let queue_a = QueueStore::new("a", store.clone());
        let queue_b = QueueStore::new("b", store.clone());

        queue_a.push_entry(request("/a1")).await.expect("push a1");
        let id = queue_a.get_all().await.expect("get_all a")[0].id.expect("id assigned");

        // Deleting through the other queue's store still removes the entry.
        queue_b.delete_entry(id).await.expect("delete succeeds");

        let a_entries = queue_a.get_all().await.expect("get_all a");
        assert!(a_entries.is_empty());
    }

    #[tokio::test]
    async fn strict_mode_rejects_non_object_payloads() {
        let (queue, _store) = setup_queue("sync");

        let result = queue.push_entry(QueueEntry::new(json!("not an object"))).await;
        assert!(matches!(result, Err(RequeueError::InvalidInput(_))));

        let result = queue.unshift_entry(QueueEntry::new(json!([1, 2, 3]))).await;
        assert!(matches!(result, Err(RequeueError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn lax_mode_passes_payloads_through() {
        let store = Arc::new(MemoryEntryStore::default());
        let queue = QueueStore::new("sync", store.clone()).with_strict(false);

        queue.push_entry(QueueEntry::new(json!("raw"))).await.expect("push succeeds");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].request_data, json!("raw"));
    }

    #[tokio::test]
    async fn push_strips_caller_supplied_id() {
        let (queue, _store) = setup_queue("sync");

        let mut entry = request("/a");
        entry.id = Some(42);
        queue.push_entry(entry).await.expect("push succeeds");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(entries[0].id, Some(1));
    }

    #[tokio::test]
    async fn size_and_peek_observe_without_mutating() {
        let (queue, _store) = setup_queue("sync");

        queue.push_entry(request("/a")).await.expect("push /a");
        queue.push_entry(request("/b")).await.expect("push /b");

        assert_eq!(queue.size().await.expect("size succeeds"), 2);

        let front = queue
            .peek_entry(Direction::Forward)
            .await
            .expect("peek succeeds")
            .expect("entry present");
        assert_eq!(front.request_data["url"], "/a");

        let back = queue
            .peek_entry(Direction::Backward)
            .await
            .expect("peek succeeds")
            .expect("entry present");
        assert_eq!(back.request_data["url"], "/b");

        assert_eq!(queue.size().await.expect("size succeeds"), 2);
    }

    #[tokio::test]
    async fn queue_membership_is_stamped_not_caller_supplied() {
        let (queue, _store) = setup_queue("sync");

        let mut entry = request("/a");
        entry.queue_name = "forged".into();
        queue.push_entry(entry).await.expect("push succeeds");

        let entries = queue.get_all().await.expect("get_all succeeds");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].queue_name, "sync");
    }
}
