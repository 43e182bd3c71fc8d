//! Breadth-first link crawler
//!
//! Starts at the site root and follows internal links level by level:
//! - robots.txt rules are honored, including `Crawl-delay`
//! - Only HTML pages are parsed for links
//! - Pages with `<meta name="robots" content="nofollow">` are recorded but not expanded
//! - The crawl stops at `max-depth`, `max-pages` or the run deadline,
//!   whichever comes first

use crate::config::{CrawlConfig, FetcherConfig, UserAgentConfig};
use crate::crawler::fetcher::{fetch_page, PageFetch};
use crate::crawler::parser::parse_html;
use crate::crawler::{CrawlError, CrawlSource, CrawledUrl};
use crate::robots::{is_allowed, ParsedRobots};
use crate::sitemap::build_http_client;
use crate::url::{is_internal_host, normalize_url};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use url::Url;

/// Upper bound on a robots.txt `Crawl-delay` the crawler will honor
const MAX_CRAWL_DELAY_SECS: f64 = 10.0;

/// HTML link crawler implementing [`CrawlSource`]
#[derive(Debug, Clone)]
pub struct LinkCrawler {
    client: Client,
    /// Product token matched against robots.txt `User-agent` groups
    robots_agent: String,
    max_concurrent: usize,
}

/// Progress of one crawl
struct CrawlState {
    base_host: String,
    visited: HashSet<String>,
    recorded: HashSet<String>,
    found: Vec<CrawledUrl>,
    /// `max_pages`; bounds `found`, external links included
    limit: usize,
}

impl CrawlState {
    fn is_full(&self) -> bool {
        self.found.len() >= self.limit
    }

    fn record(&mut self, url: &str, depth: u32) {
        if self.is_full() {
            return;
        }
        if self.recorded.insert(url.to_string()) {
            self.found.push(CrawledUrl {
                url: url.to_string(),
                depth,
            });
        }
    }

    fn is_internal(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| is_internal_host(&self.base_host, host))
            .unwrap_or(false)
    }
}

impl LinkCrawler {
    /// Creates a crawler with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identification sent with every request
    /// * `fetcher` - Timeouts and the concurrency cap
    pub fn new(user_agent: &UserAgentConfig, fetcher: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, fetcher)?;
        Ok(Self::with_client(
            client,
            &user_agent.crawler_name,
            fetcher.max_concurrent_requests,
        ))
    }

    pub fn with_client(client: Client, robots_agent: &str, max_concurrent: usize) -> Self {
        Self {
            client,
            robots_agent: robots_agent.to_string(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    async fn fetch_one(
        &self,
        url: &str,
        permits: &Semaphore,
        delay: Option<Duration>,
        deadline: Instant,
    ) -> PageFetch {
        let Ok(_permit) = permits.acquire().await else {
            return PageFetch::NetworkError {
                error: "crawler shut down".to_string(),
            };
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        tokio::time::timeout_at(deadline, fetch_page(&self.client, url))
            .await
            .unwrap_or_else(|_| PageFetch::NetworkError {
                error: "run budget exhausted".to_string(),
            })
    }

    /// Handles the links of one HTML page, returning the pages to visit next
    fn expand(
        &self,
        state: &mut CrawlState,
        robots: &ParsedRobots,
        page_url: &Url,
        body: &str,
        depth: u32,
        config: &CrawlConfig,
    ) -> Vec<String> {
        let parsed = parse_html(body, page_url);
        if parsed.nofollow {
            tracing::debug!("{} is nofollow; not expanding", page_url);
            return Vec::new();
        }

        let mut next = Vec::new();
        let link_depth = depth + 1;

        for link in parsed.links.iter().chain(parsed.canonical.iter()) {
            let Ok(url) = normalize_url(link) else {
                continue;
            };

            if !state.is_internal(&url) {
                if config.include_external {
                    state.record(url.as_str(), link_depth);
                }
                continue;
            }

            if link_depth > config.max_depth {
                continue;
            }

            if !state.visited.insert(url.to_string()) {
                continue;
            }

            if !is_allowed(robots, url.as_str(), &self.robots_agent) {
                tracing::debug!("{} disallowed by robots.txt", url);
                continue;
            }

            next.push(url.to_string());
        }

        next
    }
}

#[async_trait]
impl CrawlSource for LinkCrawler {
    async fn crawl(
        &self,
        base_url: &Url,
        config: &CrawlConfig,
        robots_content: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<CrawledUrl>, CrawlError> {
        let start = normalize_url(base_url.as_str())?;
        let base_host = start
            .host_str()
            .ok_or_else(|| CrawlError::StartPageUnavailable {
                url: start.to_string(),
                reason: "no host".to_string(),
            })?
            .to_string();

        let robots = robots_content
            .map(ParsedRobots::from_content)
            .unwrap_or_else(ParsedRobots::allow_all);

        if !is_allowed(&robots, start.as_str(), &self.robots_agent) {
            tracing::info!("Crawl start {} disallowed by robots.txt", start);
            return Ok(Vec::new());
        }

        // Crawl-delay serializes requests
        let delay = robots
            .crawl_delay(&self.robots_agent)
            .map(|secs| Duration::from_secs_f64(secs.clamp(0.0, MAX_CRAWL_DELAY_SECS)));
        let permits = Semaphore::new(if delay.is_some() { 1 } else { self.max_concurrent });

        let mut state = CrawlState {
            base_host,
            visited: HashSet::from([start.to_string()]),
            recorded: HashSet::new(),
            found: Vec::new(),
            limit: config.max_pages,
        };

        let mut frontier = vec![start.to_string()];
        let mut pages_fetched = 0usize;
        let mut depth = 0u32;

        tracing::info!(
            "Crawling {} (max depth {}, max pages {})",
            start,
            config.max_depth,
            config.max_pages
        );

        while !frontier.is_empty() && pages_fetched < config.max_pages && !state.is_full() {
            if Instant::now() >= deadline {
                tracing::warn!("Crawl stopped at depth {}: run budget exhausted", depth);
                break;
            }

            frontier.truncate(config.max_pages - pages_fetched);
            pages_fetched += frontier.len();

            let results = join_all(
                frontier
                    .iter()
                    .map(|url| self.fetch_one(url, &permits, delay, deadline)),
            )
            .await;

            let mut next = Vec::new();
            for (url, result) in frontier.iter().zip(results) {
                match result {
                    PageFetch::Html {
                        final_url, body, ..
                    } => {
                        let page_url = normalize_url(&final_url)
                            .or_else(|_| normalize_url(url))?;
                        if !state.is_internal(&page_url) {
                            // Redirected off-site
                            continue;
                        }
                        state.visited.insert(page_url.to_string());
                        state.record(page_url.as_str(), depth);
                        next.extend(self.expand(&mut state, &robots, &page_url, &body, depth, config));
                    }
                    PageFetch::NonHtml { final_url, .. } => {
                        if let Ok(page_url) = normalize_url(&final_url) {
                            if state.is_internal(&page_url) {
                                state.record(page_url.as_str(), depth);
                            }
                        }
                    }
                    PageFetch::HttpError { status_code } => {
                        if depth == 0 {
                            return Err(CrawlError::StartPageUnavailable {
                                url: url.clone(),
                                reason: format!("HTTP {}", status_code),
                            });
                        }
                        tracing::debug!("Crawl: {} answered HTTP {}", url, status_code);
                    }
                    PageFetch::NetworkError { error } => {
                        if depth == 0 {
                            return Err(CrawlError::StartPageUnavailable {
                                url: url.clone(),
                                reason: error,
                            });
                        }
                        tracing::debug!("Crawl: {} failed: {}", url, error);
                    }
                }
            }

            frontier = next;
            depth += 1;
        }

        tracing::info!(
            "Crawl finished: {} page(s) fetched, {} URL(s) found",
            pages_fetched,
            state.found.len()
        );

        Ok(state.found)
    }
}
