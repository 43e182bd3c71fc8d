//! SEO URL discovery engine
//!
//! This crate discovers every URL of a client website that an SEO scan should
//! look at. It resolves sitemap-index trees recursively, merges the sitemap
//! URLs with the URLs found by a bounded link crawl, scores each URL and
//! returns a single ranked [`DiscoveryReport`].

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod robots;
pub mod sitemap;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for discovery operations
///
/// Failures of individual sitemaps never surface here; they are recorded in
/// the report. This type covers orchestration failures only.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use discovery::{DiscoveryReport, DiscoveryService};
pub use sitemap::{SitemapResolver, SitemapType};
pub use crate::url::{base_url_for_domain, normalize_url, url_depth};
