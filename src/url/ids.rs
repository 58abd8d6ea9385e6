/// Strips query string and fragment from an href
fn strip_suffixes(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Extracts a message id from a link such as `000123.html` or `2020-January/000123.html`
///
/// # Examples
///
/// ```
/// use pipermail_harvester::url::message_id_from_href;
///
/// assert_eq!(message_id_from_href("000123.html"), Some("000123".to_string()));
/// assert_eq!(message_id_from_href("../2020-May/42.html#42"), Some("42".to_string()));
/// assert_eq!(message_id_from_href(""), None);
/// ```
pub fn message_id_from_href(href: &str) -> Option<String> {
    let path = strip_suffixes(href.trim());
    let file = path.rsplit('/').next()?;
    let id = file.split('.').next()?;

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Extracts a list id from a catalog link such as `listinfo/python-dev`
///
/// The id is lowercased; list ids are case-insensitive.
pub fn list_id_from_href(href: &str) -> Option<String> {
    let path = strip_suffixes(href.trim()).trim_end_matches('/');
    let id = path.rsplit('/').next()?.trim();

    if id.is_empty() {
        None
    } else {
        Some(id.to_lowercase())
    }
}

/// Extracts a page token from a summary-page link such as `2020-January/thread.html`
///
/// Only links into a page's thread listing yield a token.
pub fn page_token_from_href(href: &str) -> Option<String> {
    let path = strip_suffixes(href.trim());
    let token = path.strip_suffix("thread.html")?.trim_end_matches('/');
    let token = token.rsplit('/').next()?;

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_plain() {
        assert_eq!(message_id_from_href("100.html"), Some("100".to_string()));
    }

    #[test]
    fn test_message_id_with_directories() {
        assert_eq!(
            message_id_from_href("/pipermail/python-dev/2020-January/000123.html"),
            Some("000123".to_string())
        );
    }

    #[test]
    fn test_message_id_ignores_query_and_fragment() {
        assert_eq!(
            message_id_from_href("100.html?x=1#top"),
            Some("100".to_string())
        );
    }

    #[test]
    fn test_message_id_rejects_empty() {
        assert_eq!(message_id_from_href(".html"), None);
        assert_eq!(message_id_from_href("dir/"), None);
        assert_eq!(message_id_from_href("#anchor"), None);
    }

    #[test]
    fn test_list_id() {
        assert_eq!(
            list_id_from_href("listinfo/Python-Dev"),
            Some("python-dev".to_string())
        );
        assert_eq!(
            list_id_from_href("https://mail.python.org/mailman/listinfo/numpy-svn/"),
            Some("numpy-svn".to_string())
        );
        assert_eq!(list_id_from_href(""), None);
        assert_eq!(list_id_from_href("/"), None);
    }

    #[test]
    fn test_page_token() {
        assert_eq!(
            page_token_from_href("2020-January/thread.html"),
            Some("2020-January".to_string())
        );
        assert_eq!(
            page_token_from_href("/pipermail/python-dev/2019-December/thread.html"),
            Some("2019-December".to_string())
        );
    }

    #[test]
    fn test_page_token_rejects_other_links() {
        assert_eq!(page_token_from_href("2020-January/date.html"), None);
        assert_eq!(page_token_from_href("2020-January.txt.gz"), None);
        assert_eq!(page_token_from_href("thread.html"), None);
    }
}
