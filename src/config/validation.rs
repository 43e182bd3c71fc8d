use crate::config::types::{
    Config, CrawlConfig, FetcherConfig, OutputConfig, PriorityWeights, ResolverConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_resolver_config(&config.resolver)?;
    validate_crawl_config(&config.crawl)?;
    validate_priority_weights(&config.priority)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
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

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "fetcher timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetcher connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max-body-bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    Ok(())
}

fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 || config.max_depth > 20 {
        return Err(ConfigError::Validation(format!(
            "resolver max-depth must be between 1 and 20, got {}",
            config.max_depth
        )));
    }

    if config.max_sitemaps < 1 {
        return Err(ConfigError::Validation(
            "resolver max-sitemaps must be >= 1".to_string(),
        ));
    }

    if config.run_budget_secs < 1 {
        return Err(ConfigError::Validation(
            "resolver run-budget-secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "resolver max-retries must be <= 5, got {}",
            config.max_retries
        )));
    }

    for path in &config.well_known_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "well-known path '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "crawl max-pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_priority_weights(weights: &PriorityWeights) -> Result<(), ConfigError> {
    let components = [
        ("declared-weight", weights.declared),
        ("changefreq-weight", weights.changefreq),
        ("recency-weight", weights.recency),
        ("depth-weight", weights.depth),
    ];

    for (name, value) in components {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
    }

    if weights.total() <= 0.0 {
        return Err(ConfigError::Validation(
            "at least one priority weight must be positive".to_string(),
        ));
    }

    if !weights.recency_half_life_days.is_finite() || weights.recency_half_life_days <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "recency-half-life-days must be positive, got {}",
            weights.recency_half_life_days
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.summary_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "database_path cannot be empty when set".to_string(),
        ));
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

    let (local, domain) = email.split_once('@').ok_or_else(|| {
        ConfigError::Validation(format!("Invalid email format: '{}'", email))
    })?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
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
