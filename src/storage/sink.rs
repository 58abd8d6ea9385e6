//! Batched upserts of enriched messages
//!
//! Messages are written as they arrive and committed every `commit_every` writes.
//! A failed write rolls back the open batch, so the store only ever holds whole
//! batches.

use crate::model::Message;
use crate::storage::traits::{Storage, StorageResult};
use crate::HarvestError;
use std::sync::{Mutex, MutexGuard};

struct SinkState<S> {
    storage: S,
    pending: u32,
    committed: u64,
}

/// Write side of the store shared by the crawl
pub struct UpsertSink<S: Storage> {
    state: Mutex<SinkState<S>>,
    commit_every: u32,
}

impl<S: Storage> UpsertSink<S> {
    pub fn new(storage: S, commit_every: u32) -> Self {
        Self {
            state: Mutex::new(SinkState {
                storage,
                pending: 0,
                committed: 0,
            }),
            commit_every: commit_every.max(1),
        }
    }

    /// Creates or replaces `message` in the store
    pub fn merge(&self, message: &Message) -> Result<(), HarvestError> {
        let mut state = self.lock();

        if !state.storage.in_batch() {
            state.storage.begin_batch()?;
        }

        if let Err(e) = state.storage.upsert_message(message) {
            tracing::error!(
                "Failed to store message {} of list {}: {}",
                message.message_id,
                message.list_id,
                e
            );
            let discarded = state.pending;
            state.pending = 0;
            if let Err(rollback) = state.storage.rollback_batch() {
                tracing::error!("Rollback failed: {}", rollback);
            }
            tracing::warn!("Discarded {} uncommitted messages", discarded);
            return Err(e.into());
        }

        state.pending += 1;
        if state.pending >= self.commit_every {
            Self::commit(&mut state)?;
        }
        Ok(())
    }

    /// Commits any open batch
    pub fn flush(&self) -> Result<(), HarvestError> {
        let mut state = self.lock();
        if state.storage.in_batch() {
            Self::commit(&mut state)?;
        }
        Ok(())
    }

    /// Number of messages durably written through this sink
    pub fn committed(&self) -> u64 {
        self.lock().committed
    }

    /// Runs `f` against the underlying store
    pub fn with_storage<T>(&self, f: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        f(&mut self.lock().storage)
    }

    pub fn into_inner(self) -> S {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.storage
    }

    fn commit(state: &mut SinkState<S>) -> Result<(), HarvestError> {
        state.storage.commit_batch()?;
        tracing::debug!("Committed {} messages", state.pending);
        state.committed += u64::from(state.pending);
        state.pending = 0;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SinkState<S>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn message(id: &str) -> Message {
        Message {
            list_id: "test-list".to_string(),
            message_id: id.to_string(),
            page: "2020-January".to_string(),
            thread_parent: id.to_string(),
            thread_idx: 0,
            thread_indent: 0,
            author: None,
            email: None,
            subject: None,
            sent_at: None,
            text: None,
        }
    }

    #[test]
    fn test_commits_every_n_messages() {
        let sink = UpsertSink::new(SqliteStorage::new_in_memory().unwrap(), 2);

        sink.merge(&message("1")).unwrap();
        assert_eq!(sink.committed(), 0);
        sink.merge(&message("2")).unwrap();
        assert_eq!(sink.committed(), 2);
        sink.merge(&message("3")).unwrap();
        assert_eq!(sink.committed(), 2);

        sink.flush().unwrap();
        assert_eq!(sink.committed(), 3);
        assert!(!sink.with_storage(|s| Ok(s.in_batch())).unwrap());
    }

    #[test]
    fn test_flush_without_writes() {
        let sink = UpsertSink::new(SqliteStorage::new_in_memory().unwrap(), 10);
        sink.flush().unwrap();
        assert_eq!(sink.committed(), 0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let sink = UpsertSink::new(SqliteStorage::new_in_memory().unwrap(), 1);
        sink.merge(&message("1")).unwrap();
        sink.merge(&message("1")).unwrap();
        sink.flush().unwrap();

        let storage = sink.into_inner();
        assert_eq!(storage.count_messages().unwrap(), 1);
    }
}
