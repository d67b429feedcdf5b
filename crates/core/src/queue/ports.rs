//! Port interfaces for entry storage

use async_trait::async_trait;
use requeue_domain::{Direction, QueueEntry, Result};

/// Trait for the durable entry store shared by every named queue.
///
/// Entries from all queues live in one table with a single global id
/// sequence; implementations index by `(queue_name, id)` so per-queue
/// queries never scan other partitions.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist a new entry and return the id it was stored under.
    ///
    /// When `entry.id` is `None` the store assigns the next id in its
    /// global auto-incrementing sequence. When it is set, the store inserts
    /// the entry under that id verbatim and fails if the id is occupied.
    async fn add_entry(&self, entry: &QueueEntry) -> Result<i64>;

    /// Get the entry with the globally lowest id across all queues.
    async fn first_entry(&self) -> Result<Option<QueueEntry>>;

    /// Get the entry of `queue_name` that comes first in traversal order
    /// `direction`, or `None` when the queue has no entries.
    async fn end_entry(
        &self,
        queue_name: &str,
        direction: Direction,
    ) -> Result<Option<QueueEntry>>;

    /// Get every entry of `queue_name` in ascending id order.
    async fn all_entries(&self, queue_name: &str) -> Result<Vec<QueueEntry>>;

    /// Count the entries of `queue_name`.
    async fn count_entries(&self, queue_name: &str) -> Result<usize>;

    /// Delete the entry with the given id. Silent when the id is absent.
    async fn delete_entry(&self, id: i64) -> Result<()>;
}
