//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::Message;
use crate::storage::{ListSummary, RunRecord, RunStatus, RunTotals};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("No batch is open")]
    NoOpenBatch,

    #[error("A batch is already open")]
    BatchAlreadyOpen,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Messages are keyed by `(list_id, message_id)`; writing a message that already
/// exists replaces every one of its fields.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the outcome of a run with a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus, totals: RunTotals)
        -> StorageResult<()>;

    // ===== Messages =====

    /// Creates or replaces a message
    fn upsert_message(&mut self, message: &Message) -> StorageResult<()>;

    /// Gets one message by key
    fn get_message(&self, list_id: &str, message_id: &str) -> StorageResult<Option<Message>>;

    /// Messages of `list_id` sent at or after `since`, oldest first
    fn messages_since(&self, list_id: &str, since: DateTime<Utc>) -> StorageResult<Vec<Message>>;

    /// Total number of stored messages
    fn count_messages(&self) -> StorageResult<u64>;

    /// Number of stored messages of one list
    fn count_messages_for_list(&self, list_id: &str) -> StorageResult<u64>;

    /// Messages missing at least one optional field
    fn count_degraded_messages(&self) -> StorageResult<u64>;

    /// Per-list counts and date ranges, ordered by list id
    fn list_summaries(&self) -> StorageResult<Vec<ListSummary>>;

    // ===== Batching =====

    /// Opens a write batch; writes become durable on `commit_batch`
    fn begin_batch(&mut self) -> StorageResult<()>;

    fn commit_batch(&mut self) -> StorageResult<()>;

    /// Discards every write since `begin_batch`
    fn rollback_batch(&mut self) -> StorageResult<()>;

    fn in_batch(&self) -> bool;
}
