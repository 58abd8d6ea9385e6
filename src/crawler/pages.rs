//! Archive page enumeration
//!
//! A list's summary page has one table row per archive page (usually a month),
//! newest first. Each page's thread listing opens with a "Starting:" date that the
//! incremental gate uses to decide whether older pages are worth visiting.

use crate::crawler::dates::parse_archive_timestamp;
use crate::crawler::fetcher::{DocumentMemo, FetchClient};
use crate::model::MailingList;
use crate::url::{page_token_from_href, ArchiveLayout};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

/// Discovers the pages of a list and their start dates
#[derive(Debug)]
pub struct PageEnumerator {
    client: Arc<FetchClient>,
    layout: ArchiveLayout,
    memo: DocumentMemo,
}

impl PageEnumerator {
    pub fn new(client: Arc<FetchClient>, layout: ArchiveLayout) -> Self {
        Self {
            client,
            layout,
            memo: DocumentMemo::new(),
        }
    }

    /// Returns the page tokens of `list`, newest first
    ///
    /// A list without a summary page (e.g. 404) has no pages.
    pub async fn pages_for(&self, list: &MailingList) -> Result<Vec<String>, HarvestError> {
        let url = self.layout.list_url(list.id());
        let body = match self.client.fetch(&url).await {
            Ok(body) => body,
            Err(e) if e.is_permanent_http() => {
                tracing::warn!("No summary page for list {}: {}", list, e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let pages = parse_page_tokens(&body);
        tracing::info!("List {} has {} archive pages", list, pages.len());
        Ok(pages)
    }

    /// Returns the thread listing of `page`, reusing a copy fetched for its start date
    pub async fn thread_page(
        &self,
        list: &MailingList,
        page: &str,
    ) -> Result<Arc<str>, HarvestError> {
        let url = self.layout.thread_url(list.id(), page);
        self.memo.take_or_fetch(&self.client, &url).await
    }

    /// Returns the earliest message date of `page`
    ///
    /// Falls back to the current time when the page or its date cannot be read, so a
    /// page of unknown age never stops a crawl early.
    pub async fn start_date_of(&self, list: &MailingList, page: &str) -> DateTime<Utc> {
        let url = self.layout.thread_url(list.id(), page);
        let document = match self.memo.get_or_fetch(&self.client, &url).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    "Unable to fetch page {} of list {} for its start date: {}",
                    page,
                    list,
                    e
                );
                return Utc::now();
            }
        };

        match parse_page_start_date(&document) {
            Some(start) => start,
            None => {
                tracing::warn!(
                    "Unable to find page starting date for page {} of list {}",
                    page,
                    list
                );
                Utc::now()
            }
        }
    }

    /// Drops documents fetched ahead for the current list
    pub fn forget_lookahead(&self) {
        if !self.memo.is_empty() {
            tracing::debug!("Dropping {} unused lookahead pages", self.memo.len());
        }
        self.memo.clear();
    }
}

/// Parses a list summary page into page tokens, in document order
pub fn parse_page_tokens(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    let (Ok(row_selector), Ok(link_selector)) = (Selector::parse("tr"), Selector::parse("a[href]"))
    else {
        return pages;
    };

    for row in document.select(&row_selector) {
        let token = row
            .select(&link_selector)
            .filter_map(|link| link.value().attr("href"))
            .find_map(page_token_from_href);

        if let Some(token) = token {
            if seen.insert(token.clone()) {
                pages.push(token);
            }
        }
    }

    pages
}

/// Extracts the "Starting:" date from the first paragraph of a thread listing
pub fn parse_page_start_date(html: &str) -> Option<DateTime<Utc>> {
    let document = Html::parse_document(html);
    let paragraph_selector = Selector::parse("p").ok()?;
    let date_selector = Selector::parse("i").ok()?;

    let paragraph = document.select(&paragraph_selector).next()?;
    let date = paragraph.select(&date_selector).next()?;
    let text = date.text().collect::<String>();

    parse_archive_timestamp(&text)
}
