use std::fmt;

/// A mailing list identifier
///
/// Ids are compared case-insensitively, so they are lowercased on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MailingList {
    id: String,
}

impl MailingList {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.trim().to_lowercase(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for MailingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
