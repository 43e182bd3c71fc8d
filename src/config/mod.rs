//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use seo_discovery::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("discovery.toml")).unwrap();
//! println!("Sitemap fetch concurrency: {}", config.fetcher.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlConfig, FetcherConfig, OutputConfig, PriorityWeights, ResolverConfig,
    UserAgentConfig, DEFAULT_WELL_KNOWN_PATHS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
