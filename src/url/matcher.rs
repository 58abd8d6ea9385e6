/// Checks if a list id matches an exclusion pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "python-checkins" matches only "python-checkins"
/// 2. Prefix match: "pypy-*" matches every id starting with "pypy-"
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use pipermail_harvester::url::matches_list_pattern;
///
/// assert!(matches_list_pattern("numpy-svn", "numpy-svn"));
/// assert!(!matches_list_pattern("numpy-svn", "numpy-discussion"));
///
/// assert!(matches_list_pattern("pypy-*", "pypy-commit"));
/// assert!(!matches_list_pattern("pypy-*", "pypy"));
/// ```
pub fn matches_list_pattern(pattern: &str, candidate: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        candidate.starts_with(prefix)
    } else {
        candidate == pattern
    }
}
