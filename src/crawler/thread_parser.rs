//! Thread reconstruction from a page's thread listing
//!
//! A thread listing is a nested HTML list. Every top-level `<li>` is a thread root;
//! every `<li>` below it, at any depth, is a reply. Replies are numbered by their
//! position among all of the root's descendants in document order, and indented by
//! the number of `<ul>`/`<ol>` levels separating them from the root.

use crate::config::CrawlerConfig;
use crate::model::MessageStub;
use crate::url::message_id_from_href;
use scraper::{ElementRef, Html, Selector};

/// Parses thread listings into message stubs
#[derive(Debug, Clone)]
pub struct ThreadParser {
    listing_index: usize,
    max_depth: usize,
}

impl ThreadParser {
    /// Creates a parser reading the `listing_index`-th `<ul>` of a page (zero-based)
    pub fn new(listing_index: usize, max_depth: usize) -> Self {
        Self {
            listing_index,
            max_depth,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.thread_listing_index, config.max_thread_depth)
    }

    /// Returns the stubs of every message listed on `page`, in document order
    pub fn parse(&self, list_id: &str, page: &str, html: &str) -> Vec<MessageStub> {
        let document = Html::parse_document(html);
        let mut stubs = Vec::new();

        let Ok(list_selector) = Selector::parse("ul") else {
            return stubs;
        };

        let Some(listing) = document.select(&list_selector).nth(self.listing_index) else {
            tracing::warn!(
                "No thread listing on page {} of list {}, skipping page",
                page,
                list_id
            );
            return stubs;
        };

        for root in listing
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "li")
        {
            let Some(root_id) = own_anchor_id(root) else {
                tracing::warn!(
                    "Thread root without message link on page {} of list {}, skipping thread",
                    page,
                    list_id
                );
                continue;
            };

            stubs.push(MessageStub::root(list_id, page, &root_id));

            let replies = root
                .descendants()
                .filter(|node| node.id() != root.id())
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "li");

            for (position, reply) in replies.enumerate() {
                let thread_idx = position as u32 + 1;

                let Some(indent) = self.nesting_depth(reply, root) else {
                    tracing::warn!(
                        "Reply {} of thread {} nested deeper than {} levels, skipping",
                        thread_idx,
                        root_id,
                        self.max_depth
                    );
                    continue;
                };

                let Some(message_id) = own_anchor_id(reply) else {
                    tracing::warn!(
                        "Reply {} of thread {} on page {} has no message link, skipping",
                        thread_idx,
                        root_id,
                        page
                    );
                    continue;
                };

                stubs.push(MessageStub::reply(
                    list_id,
                    page,
                    &message_id,
                    &root_id,
                    thread_idx,
                    indent as u32,
                ));
            }
        }

        tracing::debug!(
            "Parsed {} messages from page {} of list {}",
            stubs.len(),
            page,
            list_id
        );
        stubs
    }

    /// Counts `<ul>`/`<ol>` ancestors of `item` up to `root`
    ///
    /// Returns `None` when the walk exceeds `max_depth` levels or never meets `root`.
    fn nesting_depth(&self, item: ElementRef<'_>, root: ElementRef<'_>) -> Option<usize> {
        let mut depth = 0;

        for ancestor in item.ancestors() {
            if ancestor.id() == root.id() {
                return Some(depth);
            }

            let is_list = ancestor
                .value()
                .as_element()
                .map(|e| matches!(e.name(), "ul" | "ol"))
                .unwrap_or(false);

            if is_list {
                depth += 1;
                if depth > self.max_depth {
                    return None;
                }
            }
        }

        None
    }
}

/// Finds the message id of an item's own link, ignoring links in nested lists
fn own_anchor_id(item: ElementRef<'_>) -> Option<String> {
    let mut pending: Vec<_> = item.children().collect();
    pending.reverse();

    while let Some(node) = pending.pop() {
        let Some(element) = node.value().as_element() else {
            continue;
        };

        match element.name() {
            "ul" | "ol" => continue,
            "a" => {
                if let Some(id) = element.attr("href").and_then(message_id_from_href) {
                    return Some(id);
                }
            }
            _ => {}
        }

        pending.extend(node.children().rev());
    }

    None
}
