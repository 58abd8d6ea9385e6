use chrono::{DateTime, Utc};
use std::fmt;

/// A message as known from its thread listing, before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStub {
    pub list_id: String,
    pub message_id: String,
    /// Archive page token (e.g. `2020-January`)
    pub page: String,
    /// Id of the thread root; equal to `message_id` for roots
    pub thread_parent: String,
    /// 0 for the root, then 1.. in document order among the root's descendants
    pub thread_idx: u32,
    /// Number of list-nesting levels between the message and its thread root
    pub thread_indent: u32,
}

impl MessageStub {
    /// Stub for a thread root
    pub fn root(list_id: &str, page: &str, message_id: &str) -> Self {
        Self {
            list_id: list_id.to_string(),
            message_id: message_id.to_string(),
            page: page.to_string(),
            thread_parent: message_id.to_string(),
            thread_idx: 0,
            thread_indent: 0,
        }
    }

    /// Stub for a reply somewhere beneath `root_id`
    pub fn reply(
        list_id: &str,
        page: &str,
        message_id: &str,
        root_id: &str,
        thread_idx: u32,
        thread_indent: u32,
    ) -> Self {
        Self {
            list_id: list_id.to_string(),
            message_id: message_id.to_string(),
            page: page.to_string(),
            thread_parent: root_id.to_string(),
            thread_idx,
            thread_indent,
        }
    }

    pub fn is_thread_root(&self) -> bool {
        self.thread_parent == self.message_id
    }
}

impl fmt::Display for MessageStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Message list={} page={} id={}>",
            self.list_id, self.page, self.message_id
        )
    }
}

/// Fields extracted from a message detail page; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDetails {
    pub author: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
}

impl MessageDetails {
    /// Number of fields that could not be extracted
    pub fn missing_fields(&self) -> usize {
        [
            self.author.is_none(),
            self.email.is_none(),
            self.subject.is_none(),
            self.sent_at.is_none(),
            self.text.is_none(),
        ]
        .iter()
        .filter(|missing| **missing)
        .count()
    }
}

/// A fully enriched message, keyed by `(list_id, message_id)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub list_id: String,
    pub message_id: String,
    pub page: String,
    pub thread_parent: String,
    pub thread_idx: u32,
    pub thread_indent: u32,
    pub author: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
}

impl Message {
    /// Merges extracted details onto a stub
    pub fn from_parts(stub: MessageStub, details: MessageDetails) -> Self {
        Self {
            list_id: stub.list_id,
            message_id: stub.message_id,
            page: stub.page,
            thread_parent: stub.thread_parent,
            thread_idx: stub.thread_idx,
            thread_indent: stub.thread_indent,
            author: details.author,
            email: details.email,
            subject: details.subject,
            sent_at: details.sent_at,
            text: details.text,
        }
    }

    pub fn is_thread_root(&self) -> bool {
        self.thread_parent == self.message_id
    }
}
