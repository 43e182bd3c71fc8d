//! Robots.txt handling module
//!
//! robots.txt matters twice during discovery: its `Sitemap:` directives seed
//! the sitemap resolver, and its access rules gate the link crawler.

mod parser;

pub use parser::ParsedRobots;

use crate::sitemap::SitemapFetch;
use url::Url;

/// Fetches robots.txt for a site
///
/// A missing or unreadable robots.txt is not an error for discovery: the
/// caller falls back to well-known sitemap locations and allows everything.
///
/// # Arguments
///
/// * `fetcher` - The fetcher used for sitemap requests
/// * `base_url` - The site root, e.g. `https://example.com/`
///
/// # Returns
///
/// * `Some(String)` - The robots.txt body
/// * `None` - robots.txt could not be fetched
pub async fn fetch_robots(fetcher: &dyn SitemapFetch, base_url: &Url) -> Option<String> {
    let robots_url = base_url.join("/robots.txt").ok()?;

    match fetcher.fetch(robots_url.as_str()).await {
        Ok(fetched) => {
            tracing::debug!("Fetched {} ({} bytes)", robots_url, fetched.body.len());
            Some(String::from_utf8_lossy(&fetched.body).into_owned())
        }
        Err(e) => {
            tracing::info!("No robots.txt at {}: {}", robots_url, e);
            None
        }
    }
}

/// Extracts the sitemap URLs declared in robots.txt content
///
/// # Arguments
///
/// * `content` - The raw robots.txt file content
/// * `base_url` - Used to resolve relative `Sitemap:` values
pub fn extract_sitemap_urls(content: &str, base_url: &Url) -> Vec<String> {
    ParsedRobots::from_content(content).sitemap_urls(Some(base_url))
}

/// Checks if a URL is allowed by robots.txt
///
/// # Arguments
///
/// * `robots` - The parsed robots.txt data
/// * `url` - The URL to check
/// * `user_agent` - The user agent string
pub fn is_allowed(robots: &ParsedRobots, url: &str, user_agent: &str) -> bool {
    robots.is_allowed(url, user_agent)
}
