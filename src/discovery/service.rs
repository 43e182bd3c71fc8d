//! URL discovery service
//!
//! Orchestrates one discovery run for one site:
//!
//! 1. Resolve the sitemap tree
//! 2. Crawl the site within what is left of the run budget
//! 3. Merge both URL sets by normalized URL
//! 4. Score every URL
//! 5. Attribute sources and assemble the report

use crate::config::{Config, CrawlConfig};
use crate::crawler::{CrawlError, CrawlSource};
use crate::discovery::merge::Contribution;
use crate::discovery::priority::PriorityCalculator;
use crate::discovery::report::{
    DiscoveredUrl, DiscoveryReport, DiscoveryStatistics, ReportWarning, SourceBreakdown,
    WarningKind,
};
use crate::robots;
use crate::sitemap::{HttpSitemapFetcher, SitemapFetch, SitemapResolver};
use crate::url::{base_url_for_domain, url_depth};
use crate::{DiscoveryError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Extra time a crawl source gets past the deadline before it is abandoned
const CRAWL_GRACE: Duration = Duration::from_secs(5);

/// Runs discovery for one site at a time
pub struct DiscoveryService {
    config: Config,
    fetcher: Option<Arc<dyn SitemapFetch>>,
    reference_time: Option<DateTime<Utc>>,
}

impl DiscoveryService {
    /// Creates a service that fetches over HTTP
    ///
    /// Each call to [`DiscoveryService::discover`] builds a fresh fetcher, so
    /// the concurrency cap applies per run.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            fetcher: None,
            reference_time: None,
        }
    }

    /// Creates a service that reads sitemaps through `fetcher`
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn SitemapFetch>) -> Self {
        Self {
            config,
            fetcher: Some(fetcher),
            reference_time: None,
        }
    }

    /// Fixes the reference time used for recency scoring
    pub fn with_reference_time(mut self, as_of: DateTime<Utc>) -> Self {
        self.reference_time = Some(as_of);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discovers, scores and ranks every URL of a site
    ///
    /// # Arguments
    ///
    /// * `domain` - Bare host (`example.com`) or absolute base URL
    /// * `robots_content` - robots.txt body; fetched when `None`
    /// * `crawl_config` - Bounds for the crawl collaborator
    /// * `crawler` - Source of crawled URLs
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveryReport)` - The report, possibly partial if the run budget ran out
    /// * `Err(DiscoveryError)` - The domain is invalid or no HTTP client could be built
    ///
    /// # Example
    ///
    /// ```no_run
    /// use seo_discovery::config::load_config;
    /// use seo_discovery::crawler::NoopCrawlSource;
    /// use seo_discovery::DiscoveryService;
    /// use std::path::Path;
    ///
    /// # async fn run() -> seo_discovery::Result<()> {
    /// let config = load_config(Path::new("discovery.toml"))?;
    /// let crawl = config.crawl.clone();
    /// let service = DiscoveryService::new(config);
    ///
    /// let report = service
    ///     .discover("example.com", None, &crawl, &NoopCrawlSource)
    ///     .await?;
    /// println!("{} URLs", report.total_urls);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn discover(
        &self,
        domain: &str,
        robots_content: Option<&str>,
        crawl_config: &CrawlConfig,
        crawler: &dyn CrawlSource,
    ) -> Result<DiscoveryReport> {
        let as_of = self.reference_time.unwrap_or_else(Utc::now);
        let started = Instant::now();
        let deadline = started + self.config.resolver.run_budget();

        let base_url = base_url_for_domain(domain)
            .map_err(|e| DiscoveryError::InvalidDomain(format!("{}: {}", domain, e)))?;

        let fetcher: Arc<dyn SitemapFetch> = match &self.fetcher {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::new(HttpSitemapFetcher::new(
                &self.config.user_agent,
                &self.config.fetcher,
            )?),
        };

        tracing::info!("Starting discovery for {}", base_url);

        // robots.txt is read once and shared by the resolver and the crawl
        let robots = match robots_content {
            Some(content) => Some(content.to_string()),
            None => robots::fetch_robots(fetcher.as_ref(), &base_url).await,
        };

        // 1. Sitemaps
        let resolver = SitemapResolver::new(fetcher, self.config.resolver.clone());
        let resolved = resolver
            .resolve_until(&base_url, Some(robots.as_deref().unwrap_or("")), deadline)
            .await;

        let mut warnings = resolved.warnings;
        let mut urls = resolved.urls;

        // 2. Crawl
        let crawled = self
            .run_crawl(crawler, &base_url, crawl_config, robots.as_deref(), deadline)
            .await;
        let crawled = match crawled {
            Ok(crawled) => crawled,
            Err(e) => {
                tracing::warn!("Crawl of {} failed: {}", base_url, e);
                warnings.push(ReportWarning::new(
                    base_url.as_str(),
                    WarningKind::CrawlFailed,
                    e.to_string(),
                ));
                Vec::new()
            }
        };
        let crawled_urls = crawled.len();

        // 3. Merge
        for (ordinal, found) in crawled.into_iter().enumerate() {
            urls.add(Contribution::from_crawl(
                found.url,
                found.depth as usize,
                ordinal as u64,
            ));
        }

        // 4. Score
        let calculator = PriorityCalculator::new(self.config.priority.clone());
        let mut ranked: Vec<DiscoveredUrl> = urls
            .into_sorted()
            .into_iter()
            .map(|merged| {
                let depth = Url::parse(merged.url())
                    .map(|u| url_depth(&u))
                    .unwrap_or(0);
                let best = &merged.best;
                let score =
                    calculator.calculate(best.priority, best.changefreq, best.lastmod, depth, as_of);
                DiscoveredUrl::from_merged(merged, score, depth)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.calculated_priority
                .total_cmp(&a.calculated_priority)
                .then_with(|| a.url.cmp(&b.url))
        });

        // 5. Report
        let sources = SourceBreakdown::from_urls(&ranked);
        let statistics = DiscoveryStatistics {
            resolver: resolved.statistics,
            crawled_urls,
            total_elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Discovery for {} finished: {} URL(s) ({} from sitemaps, {} from crawl, {} both)",
            base_url,
            ranked.len(),
            sources.sitemap.count,
            sources.crawl.count,
            sources.both.count
        );

        Ok(DiscoveryReport {
            domain: domain.to_string(),
            generated_at: as_of,
            discovered_sitemaps: resolved.discovered_sitemaps,
            sitemap_indexes: resolved.sitemap_indexes,
            sitemaps: resolved.sitemaps,
            total_urls: ranked.len(),
            urls: ranked,
            sources,
            statistics,
            parsing_errors: resolved.parsing_errors,
            warnings,
        })
    }

    async fn run_crawl(
        &self,
        crawler: &dyn CrawlSource,
        base_url: &Url,
        crawl_config: &CrawlConfig,
        robots: Option<&str>,
        deadline: Instant,
    ) -> std::result::Result<Vec<crate::crawler::CrawledUrl>, CrawlError> {
        if Instant::now() >= deadline {
            return Err(CrawlError::DeadlineExceeded);
        }

        tokio::time::timeout_at(
            deadline + CRAWL_GRACE,
            crawler.crawl(base_url, crawl_config, robots, deadline),
        )
        .await
        .unwrap_or(Err(CrawlError::DeadlineExceeded))
    }
}
