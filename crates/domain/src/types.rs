//! Queue entry and ordering types
//!
//! These types represent the persisted queue schema and are used by the
//! entry store ports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One deferred work item awaiting replay.
///
/// Entries carry a globally unique ordering id that is assigned at persist
/// time, never by the caller. Within one queue name, ascending id order is
/// insertion order for back-pushed entries and reverse-insertion order for
/// front-pushed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Global ordering id, shared across every queue in the store.
    /// `None` until the entry has been persisted.
    pub id: Option<i64>,
    /// Logical partition this entry belongs to. Stamped by the queue store
    /// that persists the entry; membership never changes afterwards.
    pub queue_name: String,
    /// Opaque payload describing the work to replay.
    pub request_data: Value,
    /// Insertion time in epoch milliseconds. Defaulted by the storage layer
    /// when the caller leaves it unset.
    pub timestamp: Option<i64>,
    /// Optional auxiliary data carried alongside the payload.
    pub metadata: Option<Value>,
}

impl QueueEntry {
    /// Create an entry holding the given payload.
    ///
    /// The queue name is left empty; the queue store stamps it on insert.
    pub fn new(request_data: Value) -> Self {
        Self { id: None, queue_name: String::new(), request_data, timestamp: None, metadata: None }
    }

    /// Attach a caller-supplied insertion timestamp (epoch milliseconds).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach auxiliary metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Get the insertion timestamp as `DateTime<Utc>`, if set.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

/// Traversal direction over the id order of one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending ids; the front of the queue comes first.
    Forward,
    /// Descending ids; the back of the queue comes first.
    Backward,
}
