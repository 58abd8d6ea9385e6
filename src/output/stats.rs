//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{ListSummary, RunRecord, Storage};
use crate::HarvestError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored messages
    pub total_messages: u64,

    /// Messages with at least one field missing
    pub degraded_messages: u64,

    /// Per-list totals, ordered by list id
    pub lists: Vec<ListSummary>,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl HarvestStatistics {
    pub fn total_threads(&self) -> u64 {
        self.lists.iter().map(|l| l.threads).sum()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    Ok(HarvestStatistics {
        total_messages: storage.count_messages()?,
        degraded_messages: storage.count_degraded_messages()?,
        lists: storage.list_summaries()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("(not finished)")
        );
        println!("  Lists crawled: {}", run.lists_crawled);
        println!("  Messages merged: {}", run.messages_merged);
        println!();
    }

    println!("Overview:");
    println!("  Mailing lists: {}", stats.lists.len());
    println!("  Threads: {}", stats.total_threads());
    println!("  Messages: {}", stats.total_messages);
    println!();

    if !stats.lists.is_empty() {
        println!("Messages by List:");
        for list in &stats.lists {
            println!(
                "  {}: {} messages in {} threads ({} .. {})",
                list.list_id,
                list.messages,
                list.threads,
                list.first_sent_at.as_deref().unwrap_or("?"),
                list.last_sent_at.as_deref().unwrap_or("?")
            );
        }
        println!();
    }

    let complete = stats.total_messages - stats.degraded_messages.min(stats.total_messages);
    let completeness = if stats.total_messages > 0 {
        (complete as f64 / stats.total_messages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Completeness: {:.1}% ({} / {} messages with every field)",
        completeness, complete, stats.total_messages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;
    use crate::storage::SqliteStorage;

    fn message(list: &str, id: &str, parent: &str) -> Message {
        Message {
            list_id: list.to_string(),
            message_id: id.to_string(),
            page: "2020-January".to_string(),
            thread_parent: parent.to_string(),
            thread_idx: 0,
            thread_indent: 0,
            author: Some("Alice".to_string()),
            email: None,
            subject: Some("Hi".to_string()),
            sent_at: None,
            text: Some("body".to_string()),
        }
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_run("hash").unwrap();
        storage.upsert_message(&message("a-list", "1", "1")).unwrap();
        storage.upsert_message(&message("a-list", "2", "1")).unwrap();
        storage.upsert_message(&message("b-list", "1", "1")).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.degraded_messages, 3);
        assert_eq!(stats.total_threads(), 2);
        assert_eq!(stats.lists.len(), 2);
        assert_eq!(stats.lists[0].list_id, "a-list");
        assert!(stats.latest_run.is_some());
    }

    #[test]
    fn test_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_messages, 0);
        assert!(stats.lists.is_empty());
        assert!(stats.latest_run.is_none());
    }
}
