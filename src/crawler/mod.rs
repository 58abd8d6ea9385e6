//! Crawler module for archive traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with unbounded retry and backoff
//! - List catalog and page enumeration
//! - Thread reconstruction and per-message enrichment
//! - The incremental cutoff and the bounded enrichment pool
//! - Overall crawl coordination

mod catalog;
mod coordinator;
mod dates;
mod dispatcher;
mod enricher;
mod fetcher;
mod gate;
mod pages;
mod thread_parser;

pub use catalog::{parse_catalog, ListCatalog};
pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use dates::parse_archive_timestamp;
pub use dispatcher::{Enrich, ParallelDispatcher};
pub use enricher::{FieldMarkers, MessageEnricher};
pub use fetcher::{build_http_client, Backoff, DocumentMemo, FetchClient};
pub use gate::{GateDecision, IncrementalGate};
pub use pages::{parse_page_start_date, parse_page_tokens, PageEnumerator};
pub use thread_parser::ThreadParser;

