//! Output module for reporting harvest results
//!
//! This module handles:
//! - Loading statistics about stored messages and runs
//! - Printing the `--stats` report
//! - Printing the end-of-run summary

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::CrawlSummary;

/// Prints the outcome of a finished crawl to stdout
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Run {} ===\n", summary.run_id);
    println!(
        "  Status: {}",
        if summary.interrupted {
            "interrupted"
        } else {
            "completed"
        }
    );
    println!("  Lists crawled: {}", summary.lists_crawled);
    println!("  Lists failed: {}", summary.lists_failed);
    println!("  Lists skipped (start-at): {}", summary.lists_skipped);
    println!("  Pages crawled: {}", summary.pages_crawled);
    println!("  Messages merged: {}", summary.messages_merged);
}
