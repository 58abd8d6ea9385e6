//! Message detail extraction
//!
//! Each message has its own page carrying the body and headers. Every field is
//! looked up independently through one marker selector; a missing marker nulls
//! that field and nothing else.

use crate::config::MarkerConfig;
use crate::crawler::dates::parse_archive_timestamp;
use crate::crawler::fetcher::FetchClient;
use crate::model::{Message, MessageDetails, MessageStub};
use crate::url::ArchiveLayout;
use crate::HarvestError;
use scraper::{Html, Selector};
use std::sync::Arc;

/// Compiled marker selectors for the detail page fields
#[derive(Debug, Clone)]
pub struct FieldMarkers {
    text: Selector,
    sent_at: Selector,
    author: Selector,
    email: Selector,
    subject: Selector,
}

fn compile(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

impl FieldMarkers {
    pub fn from_config(config: &MarkerConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            text: compile(&config.text)?,
            sent_at: compile(&config.sent_at)?,
            author: compile(&config.author)?,
            email: compile(&config.email)?,
            subject: compile(&config.subject)?,
        })
    }

    /// Extracts every field of a detail page
    pub fn extract(&self, html: &str, stub: &MessageStub) -> MessageDetails {
        let document = Html::parse_document(html);

        let sent_at = find_text(&document, &self.sent_at, "sent_at", stub).and_then(|raw| {
            let parsed = parse_archive_timestamp(&raw);
            if parsed.is_none() {
                tracing::warn!("Unable to parse '{}' as a datetime for {}", raw, stub);
            }
            parsed
        });

        MessageDetails {
            author: find_text(&document, &self.author, "author", stub),
            email: find_text(&document, &self.email, "email", stub),
            subject: find_text(&document, &self.subject, "subject", stub),
            sent_at,
            text: find_text(&document, &self.text, "text", stub),
        }
    }
}

/// Trimmed text of the first element matching `selector`, or `None` with a warning
fn find_text(
    document: &Html,
    selector: &Selector,
    field: &str,
    stub: &MessageStub,
) -> Option<String> {
    match document.select(selector).next() {
        Some(element) => Some(element.text().collect::<String>().trim().to_string()),
        None => {
            tracing::warn!("Couldn't find {} for {}", field, stub);
            None
        }
    }
}

/// Fetches message detail pages and merges their fields onto stubs
#[derive(Debug, Clone)]
pub struct MessageEnricher {
    client: Arc<FetchClient>,
    layout: ArchiveLayout,
    markers: FieldMarkers,
}

impl MessageEnricher {
    pub fn new(client: Arc<FetchClient>, layout: ArchiveLayout, markers: FieldMarkers) -> Self {
        Self {
            client,
            layout,
            markers,
        }
    }

    /// Returns the enriched message
    ///
    /// The detail page is fetched once. When the archive refuses it permanently
    /// (e.g. 404) every optional field is null.
    pub async fn enrich(&self, stub: MessageStub) -> Message {
        let url = self
            .layout
            .message_url(&stub.list_id, &stub.page, &stub.message_id);

        let details = match self.client.fetch(&url).await {
            Ok(body) => self.markers.extract(&body, &stub),
            Err(e) => {
                tracing::warn!("Request failed for {}: {}", stub, e);
                MessageDetails::default()
            }
        };

        if details.missing_fields() > 0 {
            tracing::debug!("{} has {} missing fields", stub, details.missing_fields());
        }

        Message::from_parts(stub, details)
    }
}
