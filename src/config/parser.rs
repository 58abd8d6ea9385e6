use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    // List ids are case-insensitive keys
    for pattern in &mut config.lists.exclude {
        *pattern = pattern.trim().to_lowercase();
    }
    if let Some(start_at) = config.crawler.start_at.as_mut() {
        *start_at = start_at.trim().to_lowercase();
    }

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded on every crawl run so runs made with different settings can be told apart.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXCLUDED_LISTS;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[archive]
base-url = "https://mail.example.org/pipermail/"
catalog-url = "https://mail.example.org/mailman/listinfo"

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "./test.db"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.parallelism, 4);
        assert_eq!(config.crawler.commit_every, 100);
        assert_eq!(config.crawler.thread_listing_index, 1);
        assert_eq!(config.retry.multiplier, 2);
        assert_eq!(config.markers.text, "pre");
        assert_eq!(config.lists.exclude.len(), DEFAULT_EXCLUDED_LISTS.len());
        assert!(config.crawler.since.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let content = format!(
            r#"{MINIMAL}
[crawler]
parallelism = 8
commit-every = 50
start-at = "Python-Dev"
since = "2024-01-01T00:00:00Z"

[retry]
initial-delay-ms = 10
max-delay-ms = 1000
multiplier = 3

[lists]
exclude = ["Numpy-SVN", "pypy-*"]

[markers]
subject = "h2"
"#
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.parallelism, 8);
        assert_eq!(config.crawler.commit_every, 50);
        assert_eq!(config.crawler.start_at.as_deref(), Some("python-dev"));
        assert_eq!(config.lists.exclude, vec!["numpy-svn", "pypy-*"]);
        assert_eq!(config.markers.subject, "h2");
        assert_eq!(config.markers.author, "b");
        assert_eq!(config.retry.max_delay_ms, 1000);
        assert!(config.crawler.since.is_some());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvester.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("{MINIMAL}\n[crawler]\nparallelism = 0\n");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
