//! SQLite-backed implementation of the entry store port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use requeue_core::EntryStore as EntryStorePort;
use requeue_domain::{Direction, QueueEntry, RequeueError, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{DbConnection, DbManager};
use crate::errors::InfraError;

/// SQLite-backed entry store.
///
/// Every named queue shares the `queue_entries` table and its single
/// AUTOINCREMENT id sequence, so an id freed by deletion is never handed out
/// again for appends. Front-inserted entries carry an explicit id below the
/// global minimum; SQLite rejects a collision with a constraint error.
pub struct SqliteEntryStore {
    db: Arc<DbManager>,
}

impl SqliteEntryStore {
    /// Construct a store backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntryStorePort for SqliteEntryStore {
    async fn add_entry(&self, entry: &QueueEntry) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let to_insert = entry.clone();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            insert_entry(&conn, &to_insert)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn first_entry(&self) -> DomainResult<Option<QueueEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<QueueEntry>> {
            let conn = db.get_connection()?;
            conn.query_row(FIRST_ENTRY_SQL, [], map_entry_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn end_entry(
        &self,
        queue_name: &str,
        direction: Direction,
    ) -> DomainResult<Option<QueueEntry>> {
        let db = Arc::clone(&self.db);
        let queue_name = queue_name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<QueueEntry>> {
            let conn = db.get_connection()?;
            let sql = match direction {
                Direction::Forward => FRONT_ENTRY_SQL,
                Direction::Backward => BACK_ENTRY_SQL,
            };
            conn.query_row(sql, params![queue_name], map_entry_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn all_entries(&self, queue_name: &str) -> DomainResult<Vec<QueueEntry>> {
        let db = Arc::clone(&self.db);
        let queue_name = queue_name.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<QueueEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(ALL_ENTRIES_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![queue_name], map_entry_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_entries(&self, queue_name: &str) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let queue_name = queue_name.to_string();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let count: i64 = conn
                .query_row(COUNT_ENTRIES_SQL, params![queue_name], |row| row.get(0))
                .map_err(map_sql_error)?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_entry(&self, id: i64) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            // Deleting an absent id is a no-op, matching the port contract.
            conn.execute(ENTRY_DELETE_SQL, params![id]).map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

const ENTRY_INSERT_SQL: &str = "INSERT INTO queue_entries (
        id, queue_name, request_data, timestamp, metadata
    ) VALUES (?1, ?2, ?3, ?4, ?5)";

const FIRST_ENTRY_SQL: &str = "SELECT id, queue_name, request_data, timestamp, metadata
    FROM queue_entries
    ORDER BY id ASC
    LIMIT 1";

const FRONT_ENTRY_SQL: &str = "SELECT id, queue_name, request_data, timestamp, metadata
    FROM queue_entries
    WHERE queue_name = ?1
    ORDER BY id ASC
    LIMIT 1";

const BACK_ENTRY_SQL: &str = "SELECT id, queue_name, request_data, timestamp, metadata
    FROM queue_entries
    WHERE queue_name = ?1
    ORDER BY id DESC
    LIMIT 1";

const ALL_ENTRIES_SQL: &str = "SELECT id, queue_name, request_data, timestamp, metadata
    FROM queue_entries
    WHERE queue_name = ?1
    ORDER BY id ASC";

const COUNT_ENTRIES_SQL: &str = "SELECT COUNT(*) FROM queue_entries WHERE queue_name = ?1";

const ENTRY_DELETE_SQL: &str = "DELETE FROM queue_entries WHERE id = ?1";

fn insert_entry(conn: &DbConnection, entry: &QueueEntry) -> DomainResult<i64> {
    let request_data = serde_json::to_string(&entry.request_data)
        .map_err(|e| RequeueError::from(InfraError::from(e)))?;
    let metadata = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RequeueError::from(InfraError::from(e)))?;
    let timestamp = entry.timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());

    // A NULL id lets the AUTOINCREMENT sequence assign the next append id.
    conn.execute(
        ENTRY_INSERT_SQL,
        params![entry.id, entry.queue_name, request_data, timestamp, metadata],
    )
    .map_err(map_sql_error)?;

    Ok(conn.last_insert_rowid())
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let request_data_raw: String = row.get(2)?;
    let request_data = serde_json::from_str(&request_data_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let metadata_raw: Option<String> = row.get(4)?;
    let metadata = metadata_raw
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(QueueEntry {
        id: Some(row.get(0)?),
        queue_name: row.get(1)?,
        request_data,
        timestamp: Some(row.get(3)?),
        metadata,
    })
}

// ============================================================================
// Error Mapping
// ============================================================================

fn map_sql_error(err: rusqlite::Error) -> RequeueError {
    RequeueError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> RequeueError {
    if err.is_cancelled() {
        RequeueError::Internal("entry store task cancelled".into())
    } else {
        RequeueError::Internal(format!("entry store task panic: {err}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
