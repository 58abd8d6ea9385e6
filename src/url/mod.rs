//! Archive URL handling
//!
//! This module knows how a pipermail archive lays out its documents, how to turn
//! the hrefs found in those documents back into list ids, page tokens and message
//! ids, and how list ids are matched against the exclusion set.

mod ids;
mod matcher;

use crate::HarvestError;
use url::Url;

// Re-export main functions
pub use ids::{list_id_from_href, message_id_from_href, page_token_from_href};
pub use matcher::matches_list_pattern;

/// Builds document URLs below the archive root
///
/// ```text
/// {base}/{list}/                       per-list summary page
/// {base}/{list}/{page}/thread.html     thread listing of one page
/// {base}/{list}/{page}/{id}.html       one message
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    base: Url,
}

impl ArchiveLayout {
    /// Creates a layout rooted at `base_url`
    ///
    /// # Examples
    ///
    /// ```
    /// use pipermail_harvester::url::ArchiveLayout;
    ///
    /// let layout = ArchiveLayout::new("https://mail.python.org/pipermail").unwrap();
    /// assert_eq!(
    ///     layout.thread_url("python-dev", "2020-January").as_str(),
    ///     "https://mail.python.org/pipermail/python-dev/2020-January/thread.html"
    /// );
    /// ```
    pub fn new(base_url: &str) -> Result<Self, HarvestError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(HarvestError::UrlParse(
                ::url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self { base })
    }

    /// Summary page listing the archive pages of one list
    pub fn list_url(&self, list_id: &str) -> Url {
        self.with_segments(&[list_id, ""])
    }

    /// Thread listing of one archive page
    pub fn thread_url(&self, list_id: &str, page: &str) -> Url {
        self.with_segments(&[list_id, page, "thread.html"])
    }

    /// Detail page of one message
    pub fn message_url(&self, list_id: &str, page: &str, message_id: &str) -> Url {
        let file = format!("{}.html", message_id);
        self.with_segments(&[list_id, page, &file])
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Returns true if `list_id` matches any exclusion pattern
///
/// Patterns are lowercase; the id is lowercased before matching.
pub fn is_excluded(list_id: &str, patterns: &[String]) -> bool {
    let list_id = list_id.to_lowercase();
    patterns
        .iter()
        .any(|pattern| matches_list_pattern(pattern, &list_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_with_trailing_slash() {
        let layout = ArchiveLayout::new("https://mail.python.org/pipermail/").unwrap();
        assert_eq!(
            layout.list_url("python-dev").as_str(),
            "https://mail.python.org/pipermail/python-dev/"
        );
        assert_eq!(
            layout.message_url("python-dev", "2020-January", "000123").as_str(),
            "https://mail.python.org/pipermail/python-dev/2020-January/000123.html"
        );
    }

    #[test]
    fn test_layout_without_trailing_slash() {
        let layout = ArchiveLayout::new("http://127.0.0.1:8080/pipermail").unwrap();
        assert_eq!(
            layout.thread_url("test-list", "2020-January").as_str(),
            "http://127.0.0.1:8080/pipermail/test-list/2020-January/thread.html"
        );
    }

    #[test]
    fn test_layout_escapes_segments() {
        let layout = ArchiveLayout::new("https://example.org/archive/").unwrap();
        let url = layout.message_url("odd list", "2020-January", "1");
        assert_eq!(
            url.as_str(),
            "https://example.org/archive/odd%20list/2020-January/1.html"
        );
    }

    #[test]
    fn test_layout_rejects_relative_base() {
        assert!(ArchiveLayout::new("pipermail/").is_err());
        assert!(ArchiveLayout::new("mailto:list@example.org").is_err());
    }

    #[test]
    fn test_is_excluded() {
        let patterns = vec!["python-checkins".to_string(), "pypy-*".to_string()];

        assert!(is_excluded("python-checkins", &patterns));
        assert!(is_excluded("Python-Checkins", &patterns));
        assert!(is_excluded("pypy-commit", &patterns));
        assert!(is_excluded("pypy-issue", &patterns));

        assert!(!is_excluded("python-dev", &patterns));
        assert!(!is_excluded("pypy", &patterns));
    }
}
