//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the harvesting process, including:
//! - Initializing storage and recording the run
//! - Enumerating lists and their pages, newest page first
//! - Parsing thread listings and dispatching enrichment
//! - Stopping early once pages fall before the incremental cutoff
//! - Handling interrupts at page boundaries

use crate::config::Config;
use crate::crawler::catalog::ListCatalog;
use crate::crawler::dispatcher::ParallelDispatcher;
use crate::crawler::enricher::{FieldMarkers, MessageEnricher};
use crate::crawler::fetcher::{build_http_client, FetchClient};
use crate::crawler::gate::{GateDecision, IncrementalGate};
use crate::crawler::pages::PageEnumerator;
use crate::crawler::thread_parser::ThreadParser;
use crate::model::MailingList;
use crate::storage::{open_storage, RunStatus, RunTotals, SqliteStorage, Storage, UpsertSink};
use crate::url::ArchiveLayout;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub lists_crawled: u64,
    pub lists_failed: u64,
    /// Lists ordered before the configured `start-at`
    pub lists_skipped: u64,
    pub pages_crawled: u64,
    pub messages_merged: u64,
    pub interrupted: bool,
}

#[derive(Debug, Default)]
struct ListOutcome {
    pages: u64,
    messages: u64,
    interrupted: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    client: Arc<FetchClient>,
    catalog: ListCatalog,
    pages: PageEnumerator,
    parser: ThreadParser,
    enricher: Arc<MessageEnricher>,
    dispatcher: ParallelDispatcher,
    sink: UpsertSink<SqliteStorage>,
    cutoff: Option<DateTime<Utc>>,
    run_id: i64,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator writing to the configured database
    pub fn new(config: Config, config_hash: &str) -> Result<Self, HarvestError> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, storage)
    }

    /// Creates a coordinator writing to `storage`
    pub fn with_storage(
        config: Config,
        config_hash: &str,
        mut storage: SqliteStorage,
    ) -> Result<Self, HarvestError> {
        if let Some(previous) = storage.get_latest_run()? {
            if previous.status == RunStatus::Running {
                tracing::warn!(
                    "Previous run {} did not finish; its messages are kept and will be refreshed",
                    previous.id
                );
            }
        }
        let run_id = storage.create_run(config_hash)?;

        let http = build_http_client(&config.user_agent)?;
        let client = Arc::new(FetchClient::new(http, config.retry.clone()));
        let layout = ArchiveLayout::new(&config.archive.base_url)?;

        let catalog = ListCatalog::new(&config.archive.catalog_url, config.lists.exclude.clone())?;
        let pages = PageEnumerator::new(Arc::clone(&client), layout.clone());
        let parser = ThreadParser::from_config(&config.crawler);
        let markers = FieldMarkers::from_config(&config.markers)?;
        let enricher = Arc::new(MessageEnricher::new(Arc::clone(&client), layout, markers));
        let dispatcher = ParallelDispatcher::new(config.crawler.parallelism as usize);
        let sink = UpsertSink::new(storage, config.crawler.commit_every);
        let cutoff = config.cutoff(Utc::now());

        Ok(Self {
            config: Arc::new(config),
            client,
            catalog,
            pages,
            parser,
            enricher,
            dispatcher,
            sink,
            cutoff,
            run_id,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the cancellation token, e.g. with one wired to Ctrl-C
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    /// Gives back the store once the crawl is over
    pub fn into_storage(self) -> SqliteStorage {
        self.sink.into_inner()
    }

    /// Crawls every list of the catalog
    ///
    /// Fails only when the catalog itself cannot be read or the run cannot be
    /// recorded; a list that fails is logged, counted and skipped.
    pub async fn run(&self) -> Result<CrawlSummary, HarvestError> {
        let start_time = Instant::now();
        let mut summary = CrawlSummary {
            run_id: self.run_id,
            ..Default::default()
        };

        tracing::info!(
            "Starting crawl run {} with {} workers",
            self.run_id,
            self.dispatcher.worker_count()
        );
        if let Some(cutoff) = self.cutoff {
            tracing::info!("Incremental crawl, skipping pages older than {}", cutoff);
        }

        let lists = match self.catalog.enumerate_lists(&self.client).await {
            Ok(lists) => lists,
            Err(e) => {
                tracing::error!("Unable to read list catalog: {}", e);
                self.finish(RunStatus::Failed, &summary)?;
                return Err(e);
            }
        };

        for list in lists {
            if self.skipped_by_start_at(&list) {
                summary.lists_skipped += 1;
                continue;
            }

            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            tracing::info!("Beginning to scrape \"{}\"", list);
            match self.crawl_list(&list).await {
                Ok(outcome) => {
                    summary.lists_crawled += 1;
                    summary.pages_crawled += outcome.pages;
                    summary.messages_merged += outcome.messages;
                    tracing::info!(
                        "Finished \"{}\": {} pages, {} messages",
                        list,
                        outcome.pages,
                        outcome.messages
                    );

                    if outcome.interrupted {
                        summary.interrupted = true;
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to crawl \"{}\": {}", list, e);
                    summary.lists_failed += 1;
                }
            }
        }

        let status = if summary.interrupted {
            tracing::warn!("Crawl interrupted, stopping at page boundary");
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.finish(status, &summary)?;

        tracing::info!(
            "Crawl {}: {} lists ({} failed, {} skipped), {} pages, {} messages in {:?}",
            status.to_db_string(),
            summary.lists_crawled,
            summary.lists_failed,
            summary.lists_skipped,
            summary.pages_crawled,
            summary.messages_merged,
            start_time.elapsed()
        );

        Ok(summary)
    }

    fn skipped_by_start_at(&self, list: &MailingList) -> bool {
        match &self.config.crawler.start_at {
            Some(start_at) => list.id() < start_at.as_str(),
            None => false,
        }
    }

    /// Crawls the pages of one list from newest to oldest
    async fn crawl_list(&self, list: &MailingList) -> Result<ListOutcome, HarvestError> {
        let result = self.crawl_pages(list).await;
        self.pages.forget_lookahead();

        let flushed = self.sink.flush();
        let outcome = result?;
        flushed?;
        Ok(outcome)
    }

    async fn crawl_pages(&self, list: &MailingList) -> Result<ListOutcome, HarvestError> {
        let pages = self.pages.pages_for(list).await?;
        let mut gate = IncrementalGate::new(self.cutoff);
        let mut outcome = ListOutcome::default();

        for (index, page) in pages.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.interrupted = true;
                break;
            }

            outcome.messages += self.crawl_page(list, page).await? as u64;
            outcome.pages += 1;

            if !gate.needs_lookahead() {
                continue;
            }
            let Some(next) = pages.get(index + 1) else {
                break;
            };

            let next_start = self.pages.start_date_of(list, next).await;
            if let GateDecision::Stop { next_start } = gate.observe(next_start) {
                tracing::info!(
                    "Stopping \"{}\" because page {} starts at {}, before the cutoff",
                    list,
                    next,
                    next_start
                );
                break;
            }
        }

        Ok(outcome)
    }

    /// Parses one page's thread listing and merges every message on it
    async fn crawl_page(&self, list: &MailingList, page: &str) -> Result<usize, HarvestError> {
        tracing::info!("Scraping \"{}\" for page {}", list, page);

        let html = match self.pages.thread_page(list, page).await {
            Ok(html) => html,
            Err(e) if e.is_permanent_http() => {
                tracing::warn!("Skipping page {} of \"{}\": {}", page, list, e);
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let stubs = self.parser.parse(list.id(), page, &html);
        let sink = &self.sink;
        let merged = self
            .dispatcher
            .dispatch(Arc::clone(&self.enricher), stubs, |message| {
                tracing::debug!(
                    "Scraped message {} (thread {}, idx {})",
                    message.message_id,
                    message.thread_parent,
                    message.thread_idx
                );
                sink.merge(&message)
            })
            .await?;

        tracing::debug!("Merged {} messages from page {} of \"{}\"", merged, page, list);
        Ok(merged)
    }

    fn finish(&self, status: RunStatus, summary: &CrawlSummary) -> Result<(), HarvestError> {
        let totals = RunTotals {
            lists_crawled: summary.lists_crawled,
            messages_merged: summary.messages_merged,
        };
        self.sink
            .with_storage(|storage| storage.finish_run(self.run_id, status, totals))?;
        Ok(())
    }
}

/// Runs a complete crawl against the configured database
pub async fn run_crawl(
    config: Config,
    config_hash: &str,
    cancel: Option<CancellationToken>,
) -> Result<CrawlSummary, HarvestError> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    if let Some(cancel) = cancel {
        coordinator = coordinator.with_cancellation(cancel);
    }
    coordinator.run().await
}
