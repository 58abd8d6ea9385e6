use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Lists excluded from every crawl unless `[lists] exclude` overrides them.
///
/// These are commit feeds, issue trackers and non-English mirrors that add noise
/// without adding discussion.
pub const DEFAULT_EXCLUDED_LISTS: &[&str] = &[
    "new-bugs-announce",
    "numpy-svn",
    "plpug",
    "pypy-commit",
    "pypy-issue",
    "pytest-issue",
    "python-checkins",
    "python-bugs-list",
    "pysilesia",
    "pytest-commit",
    "python-de",
    "python-es",
    "python-hu",
    "scipy-svn",
];

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
}

impl Config {
    /// Resolves the incremental cutoff for this run.
    ///
    /// An explicit `since` wins; otherwise `update = true` yields
    /// `now - update_window_days`. `None` means a full crawl.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(since) = self.crawler.since {
            return Some(since);
        }

        if self.crawler.update {
            return Some(now - Duration::days(i64::from(self.crawler.update_window_days)));
        }

        None
    }
}

/// Where the archive lives
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Root of the per-list archives, e.g. `https://mail.python.org/pipermail/`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Directory page listing every mailing list
    #[serde(rename = "catalog-url")]
    pub catalog_url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of enrichment workers per page (1 = sequential)
    pub parallelism: u32,

    /// Number of merged messages between store commits
    #[serde(rename = "commit-every")]
    pub commit_every: u32,

    /// Skip lists whose id sorts before this one
    #[serde(rename = "start-at")]
    pub start_at: Option<String>,

    /// Enable the incremental cutoff relative to now
    pub update: bool,

    /// Size of the incremental window when `update` is set
    #[serde(rename = "update-window-days")]
    pub update_window_days: u32,

    /// Explicit incremental cutoff (RFC 3339)
    pub since: Option<DateTime<Utc>>,

    /// Index of the thread listing `<ul>` among all `<ul>` elements of a thread page
    #[serde(rename = "thread-listing-index")]
    pub thread_listing_index: usize,

    /// Upper bound on list nesting walked when computing a reply's indent
    #[serde(rename = "max-thread-depth")]
    pub max_thread_depth: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            commit_every: 100,
            start_at: None,
            update: false,
            update_window_days: 30,
            since: None,
            thread_listing_index: 1,
            max_thread_depth: 256,
        }
    }
}

/// Exponential backoff for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 60_000,
            multiplier: 2,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Mailing list exclusion set
#[derive(Debug, Clone, Deserialize)]
pub struct ListsConfig {
    /// Exact list ids or trailing-`*` prefixes, e.g. `pypy-*`
    #[serde(default = "default_excluded_lists")]
    pub exclude: Vec<String>,
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            exclude: default_excluded_lists(),
        }
    }
}

fn default_excluded_lists() -> Vec<String> {
    DEFAULT_EXCLUDED_LISTS.iter().map(|s| s.to_string()).collect()
}

/// CSS selectors locating each field on a message detail page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub text: String,
    #[serde(rename = "sent-at")]
    pub sent_at: String,
    pub author: String,
    pub email: String,
    pub subject: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            text: "pre".to_string(),
            sent_at: "i".to_string(),
            author: "b".to_string(),
            email: "a".to_string(),
            subject: "h1".to_string(),
        }
    }
}
