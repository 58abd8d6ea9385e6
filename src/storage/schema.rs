//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    lists_crawled INTEGER NOT NULL DEFAULT 0,
    messages_merged INTEGER NOT NULL DEFAULT 0
);

-- One row per archived message; re-crawls overwrite in place
CREATE TABLE IF NOT EXISTS messages (
    list_id TEXT NOT NULL,
    message_id TEXT NOT NULL,
    page TEXT NOT NULL,
    thread_parent TEXT NOT NULL,
    thread_idx INTEGER NOT NULL,
    thread_indent INTEGER NOT NULL,
    author TEXT,
    email TEXT,
    subject TEXT,
    sent_at TEXT,
    text TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (list_id, message_id)
);

CREATE INDEX IF NOT EXISTS idx_messages_sent_at ON messages(list_id, sent_at);
CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(list_id, thread_parent);
CREATE INDEX IF NOT EXISTS idx_messages_page ON messages(list_id, page);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "messages"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
