//! Crawl collaborator
//!
//! Discovery merges sitemap URLs with URLs found by crawling the site. The
//! crawl is reached through the [`CrawlSource`] trait so that the discovery
//! service does not care how links are found:
//! - [`LinkCrawler`] fetches HTML pages breadth-first and follows internal links
//! - [`NoopCrawlSource`] finds nothing, for sitemap-only runs

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::LinkCrawler;
pub use fetcher::{fetch_page, PageFetch};
pub use parser::{parse_html, ParsedPage};

use crate::config::CrawlConfig;
use crate::UrlError;
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// A URL found by the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledUrl {
    /// Normalized URL
    pub url: String,
    /// Link distance from the start page
    pub depth: u32,
}

/// Why a crawl produced no result at all
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid crawl start URL: {0}")]
    InvalidStart(#[from] UrlError),

    #[error("start page {url} unavailable: {reason}")]
    StartPageUnavailable { url: String, reason: String },

    #[error("crawl did not finish before the run deadline")]
    DeadlineExceeded,
}

/// Source of crawled URLs
#[async_trait]
pub trait CrawlSource: Send + Sync {
    /// Crawls the site rooted at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - The site root
    /// * `config` - Depth, page and external-link bounds
    /// * `robots_content` - robots.txt body; `None` allows everything
    /// * `deadline` - The crawl must return by this instant
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawledUrl>)` - Distinct normalized URLs in discovery order
    /// * `Err(CrawlError)` - The crawl could not start
    async fn crawl(
        &self,
        base_url: &Url,
        config: &CrawlConfig,
        robots_content: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<CrawledUrl>, CrawlError>;
}

/// A crawl source that finds nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCrawlSource;

#[async_trait]
impl CrawlSource for NoopCrawlSource {
    async fn crawl(
        &self,
        _base_url: &Url,
        _config: &CrawlConfig,
        _robots_content: Option<&str>,
        _deadline: Instant,
    ) -> Result<Vec<CrawledUrl>, CrawlError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_noop_crawl_source() {
        let base = Url::parse("https://example.com/").unwrap();
        let found = NoopCrawlSource
            .crawl(
                &base,
                &CrawlConfig::default(),
                None,
                Instant::now() + Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
