use crate::config::types::{
    ArchiveConfig, Config, CrawlerConfig, MarkerConfig, RetryConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on enrichment workers per page
const MAX_PARALLELISM: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_archive_config(&config.archive)?;
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_list_patterns(&config.lists.exclude)?;
    validate_markers(&config.markers)?;
    Ok(())
}

/// Validates the archive endpoints
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("catalog-url", &config.catalog_url)?;
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.parallelism < 1 || config.parallelism > MAX_PARALLELISM {
        return Err(ConfigError::Validation(format!(
            "parallelism must be between 1 and {}, got {}",
            MAX_PARALLELISM, config.parallelism
        )));
    }

    if config.commit_every < 1 {
        return Err(ConfigError::Validation(format!(
            "commit-every must be >= 1, got {}",
            config.commit_every
        )));
    }

    if config.update && config.update_window_days < 1 {
        return Err(ConfigError::Validation(
            "update-window-days must be >= 1 when update is enabled".to_string(),
        ));
    }

    if config.max_thread_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max-thread-depth must be >= 1, got {}",
            config.max_thread_depth
        )));
    }

    if let Some(start_at) = &config.start_at {
        if start_at.is_empty() {
            return Err(ConfigError::Validation(
                "start-at cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the backoff policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.initial_delay_ms < 1 {
        return Err(ConfigError::Validation(
            "initial-delay-ms must be >= 1".to_string(),
        ));
    }

    if config.max_delay_ms < config.initial_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= initial-delay-ms ({})",
            config.max_delay_ms, config.initial_delay_ms
        )));
    }

    if config.multiplier < 1 {
        return Err(ConfigError::Validation(
            "multiplier must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates list exclusion patterns (exact ids or a trailing `*` wildcard)
fn validate_list_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        validate_list_pattern(pattern)?;
    }
    Ok(())
}

fn validate_list_pattern(pattern: &str) -> Result<(), ConfigError> {
    let base = pattern.strip_suffix('*').unwrap_or(pattern);

    if base.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "List pattern '{}' must name at least one character before '*'",
            pattern
        )));
    }

    if base.contains('*') {
        return Err(ConfigError::InvalidPattern(format!(
            "List pattern '{}' may only use '*' as a trailing wildcard",
            pattern
        )));
    }

    if !base
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "List pattern '{}' contains invalid characters",
            pattern
        )));
    }

    Ok(())
}

/// Every marker must be a parseable CSS selector
fn validate_markers(markers: &MarkerConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("text", &markers.text),
        ("sent-at", &markers.sent_at),
        ("author", &markers.author),
        ("email", &markers.email),
        ("subject", &markers.subject),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} = '{}': {:?}", field, selector, e))
        })?;
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
