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
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use seo_discovery::config::load_config;
///
/// let config = load_config(Path::new("discovery.toml")).unwrap();
/// println!("Max sitemap depth: {}", config.resolver.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Stored with every discovery run so that runs made under different
/// settings can be told apart.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
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
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
report-path = "./report.json"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.fetcher.timeout_secs, 30);
        assert_eq!(config.fetcher.max_concurrent_requests, 5);
        assert_eq!(config.resolver.max_depth, 5);
        assert!(config.resolver.probe_well_known);
        assert!(config
            .resolver
            .well_known_paths
            .contains(&"/sitemap.xml".to_string()));
        assert_eq!(config.crawl.max_pages, 500);
        assert!(!config.crawl.include_external);
        assert!((config.priority.total() - 1.0).abs() < 1e-9);
        assert!(config.output.database_path.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
[user-agent]
crawler-name = "SeoBot"
crawler-version = "2.1"
contact-url = "https://example.com/bot"
contact-email = "bot@example.com"

[fetcher]
timeout-secs = 10
max-concurrent-requests = 3
max-body-bytes = 1048576

[resolver]
max-depth = 2
max-sitemaps = 50
probe-well-known = false

[crawl]
max-depth = 1
max-pages = 20
include-external = true

[priority]
declared-weight = 0.5
depth-weight = 0.0

[output]
report-path = "./out.json"
summary-path = "./summary.md"
database-path = "./discovery.db"
"#;

        let file = create_temp_config(content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.user_agent.crawler_name, "SeoBot");
        assert_eq!(config.fetcher.max_concurrent_requests, 3);
        assert_eq!(config.fetcher.max_body_bytes, 1_048_576);
        assert_eq!(config.resolver.max_depth, 2);
        assert!(!config.resolver.probe_well_known);
        assert_eq!(config.crawl.max_pages, 20);
        assert!(config.crawl.include_external);
        assert_eq!(config.priority.declared, 0.5);
        assert_eq!(config.priority.changefreq, 0.3);
        assert_eq!(config.output.database_path.as_deref(), Some("./discovery.db"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("{}\n[fetcher]\nmax-concurrent-requests = 0\n", MINIMAL);
        let result = parse_config(&content);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
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

        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }
}
