//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Timestamps are stored as RFC 3339 text in UTC with second precision, so
//! string order is time order.

use crate::model::Message;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ListSummary, RunRecord, RunStatus, RunTotals};
use crate::HarvestError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const MESSAGE_COLUMNS: &str = "list_id, message_id, page, thread_parent, thread_idx, \
     thread_indent, author, email, subject, sent_at, text";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, lists_crawled, messages_merged";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    batch_open: bool,
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let sent_at = match row.get::<_, Option<String>>(9)? {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(Message {
        list_id: row.get(0)?,
        message_id: row.get(1)?,
        page: row.get(2)?,
        thread_parent: row.get(3)?,
        thread_idx: row.get(4)?,
        thread_indent: row.get(5)?,
        author: row.get(6)?,
        email: row.get(7)?,
        subject: row.get(8)?,
        sent_at,
        text: row.get(10)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        lists_crawled: row.get::<_, i64>(5)? as u64,
        messages_merged: row.get::<_, i64>(6)? as u64,
    })
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            batch_open: false,
        })
    }

    /// Creates an in-memory database (tests and dry runs)
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            batch_open: false,
        })
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now_timestamp(), config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        Ok(self.conn.query_row(&sql, [], row_to_run).optional()?)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: RunTotals,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, lists_crawled = ?3,
             messages_merged = ?4 WHERE id = ?5",
            params![
                status.to_db_string(),
                now_timestamp(),
                totals.lists_crawled as i64,
                totals.messages_merged as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Messages =====

    fn upsert_message(&mut self, message: &Message) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO messages ({}, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(list_id, message_id) DO UPDATE SET
                page = excluded.page,
                thread_parent = excluded.thread_parent,
                thread_idx = excluded.thread_idx,
                thread_indent = excluded.thread_indent,
                author = excluded.author,
                email = excluded.email,
                subject = excluded.subject,
                sent_at = excluded.sent_at,
                text = excluded.text,
                updated_at = excluded.updated_at
             WHERE messages.page IS NOT excluded.page
                OR messages.thread_parent IS NOT excluded.thread_parent
                OR messages.thread_idx IS NOT excluded.thread_idx
                OR messages.thread_indent IS NOT excluded.thread_indent
                OR messages.author IS NOT excluded.author
                OR messages.email IS NOT excluded.email
                OR messages.subject IS NOT excluded.subject
                OR messages.sent_at IS NOT excluded.sent_at
                OR messages.text IS NOT excluded.text",
            MESSAGE_COLUMNS
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params![
            message.list_id,
            message.message_id,
            message.page,
            message.thread_parent,
            message.thread_idx,
            message.thread_indent,
            message.author,
            message.email,
            message.subject,
            message.sent_at.map(format_timestamp),
            message.text,
            now_timestamp(),
        ])?;
        Ok(())
    }

    fn get_message(&self, list_id: &str, message_id: &str) -> StorageResult<Option<Message>> {
        let sql = format!(
            "SELECT {} FROM messages WHERE list_id = ?1 AND message_id = ?2",
            MESSAGE_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![list_id, message_id], row_to_message)
            .optional()?)
    }

    fn messages_since(&self, list_id: &str, since: DateTime<Utc>) -> StorageResult<Vec<Message>> {
        let sql = format!(
            "SELECT {} FROM messages
             WHERE list_id = ?1 AND sent_at IS NOT NULL AND sent_at >= ?2
             ORDER BY sent_at, message_id",
            MESSAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let messages = stmt
            .query_map(params![list_id, format_timestamp(since)], row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn count_messages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM messages", [])
    }

    fn count_messages_for_list(&self, list_id: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM messages WHERE list_id = ?1",
            params![list_id],
        )
    }

    fn count_degraded_messages(&self) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM messages
             WHERE author IS NULL OR email IS NULL OR subject IS NULL
                OR sent_at IS NULL OR text IS NULL",
            [],
        )
    }

    fn list_summaries(&self) -> StorageResult<Vec<ListSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id,
                    COUNT(*),
                    SUM(CASE WHEN thread_parent = message_id THEN 1 ELSE 0 END),
                    MIN(sent_at),
                    MAX(sent_at)
             FROM messages
             GROUP BY list_id
             ORDER BY list_id",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(ListSummary {
                    list_id: row.get(0)?,
                    messages: row.get::<_, i64>(1)? as u64,
                    threads: row.get::<_, i64>(2)? as u64,
                    first_sent_at: row.get(3)?,
                    last_sent_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    // ===== Batching =====

    fn begin_batch(&mut self) -> StorageResult<()> {
        if self.batch_open {
            return Err(StorageError::BatchAlreadyOpen);
        }
        self.conn.execute_batch("BEGIN")?;
        self.batch_open = true;
        Ok(())
    }

    fn commit_batch(&mut self) -> StorageResult<()> {
        if !self.batch_open {
            return Err(StorageError::NoOpenBatch);
        }
        self.conn.execute_batch("COMMIT")?;
        self.batch_open = false;
        Ok(())
    }

    fn rollback_batch(&mut self) -> StorageResult<()> {
        if !self.batch_open {
            return Err(StorageError::NoOpenBatch);
        }
        self.batch_open = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_batch(&self) -> bool {
        self.batch_open
    }
}
