//! HTTP fetcher implementation
//!
//! This module is the only place the crawler touches the network:
//! - Building the HTTP client with a proper user agent string
//! - GET requests with unbounded retry and capped exponential backoff
//! - Classifying failures as transient (retried) or permanent (returned)
//! - Memoizing documents that are needed twice in one run

use crate::config::{RetryConfig, UserAgentConfig};
use crate::HarvestError;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use pipermail_harvester::config::UserAgentConfig;
/// use pipermail_harvester::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "PipermailHarvester".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Exponential backoff schedule, capped at a maximum delay
///
/// The sequence is non-decreasing: `initial, initial * m, initial * m^2, ...`
/// until it reaches `max`, then `max` forever.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: u32,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        let max = Duration::from_millis(config.max_delay_ms);
        Self {
            next: Duration::from_millis(config.initial_delay_ms).min(max),
            max,
            multiplier: config.multiplier.max(1),
        }
    }

    /// Returns the delay to wait before the next attempt and advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = delay
            .checked_mul(self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }
}

/// Why a single attempt did not yield a document
#[derive(Debug)]
enum AttemptError {
    /// Connection failure, timeout, 5xx, 408 or 429: worth retrying
    Transient(String),
    /// Any other non-success status: retrying will not help
    Status(u16),
    /// The request could not be built or redirected; retrying will not help
    Fatal(reqwest::Error),
}

/// Returns true for statuses that signal a temporary condition on the server side
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// HTTP GET with unbounded retry on transient failures
///
/// `fetch` only returns once the archive has answered: either with a document, or
/// with a permanent status such as 404 (`HarvestError::HttpStatus`). Transport errors
/// and server errors are retried forever, waiting according to [`Backoff`].
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    retry: RetryConfig,
}

impl FetchClient {
    pub fn new(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Fetches `url` and returns the response body
    pub async fn fetch(&self, url: &Url) -> Result<String, HarvestError> {
        let mut backoff = Backoff::new(&self.retry);
        let mut attempt: u64 = 1;

        loop {
            match self.try_fetch(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::info!("Fetched {} after {} attempts", url, attempt);
                    }
                    return Ok(body);
                }
                Err(AttemptError::Status(status)) => {
                    tracing::debug!("HTTP {} for {}, not retrying", status, url);
                    return Err(HarvestError::HttpStatus {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(AttemptError::Fatal(source)) => {
                    return Err(HarvestError::Http {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(AttemptError::Transient(reason)) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        url,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &Url) -> Result<String, AttemptError> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() || e.is_redirect() => return Err(AttemptError::Fatal(e)),
            Err(e) if e.is_timeout() => {
                return Err(AttemptError::Transient("request timeout".to_string()))
            }
            Err(e) if e.is_connect() => {
                return Err(AttemptError::Transient("connection failed".to_string()))
            }
            Err(e) => return Err(AttemptError::Transient(e.to_string())),
        };

        let status = response.status();
        if is_transient_status(status) {
            return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        // A body cut off mid-transfer is a transport failure, not a content problem
        response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("body read failed: {}", e)))
    }
}

/// Fetch-once cache of documents keyed by URL
///
/// Used for thread pages that the incremental gate inspects before the crawler
/// parses them: the first caller fetches and stores, later callers reuse.
#[derive(Debug, Default)]
pub struct DocumentMemo {
    documents: Mutex<HashMap<String, Arc<str>>>,
}

impl DocumentMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored document for `url`, fetching and storing it on first use
    pub async fn get_or_fetch(
        &self,
        client: &FetchClient,
        url: &Url,
    ) -> Result<Arc<str>, HarvestError> {
        if let Some(document) = self.lock().get(url.as_str()) {
            tracing::trace!("Memo hit for {}", url);
            return Ok(document.clone());
        }

        let document: Arc<str> = client.fetch(url).await?.into();
        self.lock()
            .insert(url.as_str().to_string(), document.clone());
        Ok(document)
    }

    /// Removes and returns the stored document for `url`, fetching it if absent
    ///
    /// A document fetched here is not stored.
    pub async fn take_or_fetch(
        &self,
        client: &FetchClient,
        url: &Url,
    ) -> Result<Arc<str>, HarvestError> {
        let stored = self.lock().remove(url.as_str());
        match stored {
            Some(document) => {
                tracing::trace!("Memo hit for {}", url);
                Ok(document)
            }
            None => Ok(client.fetch(url).await?.into()),
        }
    }

    /// Drops every stored document
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<str>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
