//! HTML parser for the link crawler
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from `<a>` tags)
//! - The canonical URL
//! - Page title
//! - A page-level `nofollow` from `<meta name="robots">`

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Absolute `<link rel="canonical">` target
    pub canonical: Option<String>,

    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,

    /// The page asks robots not to follow its links
    pub nofollow: bool,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
///
/// Per-link `rel="nofollow"` is ignored: such links are still real pages of
/// the site. A page-wide `<meta name="robots" content="nofollow">` is
/// reported through [`ParsedPage::nofollow`].
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was served from, for relative links
///
/// # Example
///
/// ```
/// use seo_discovery::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    // <base href> overrides the document URL for relative links
    let effective_base = extract_base_href(&document, base_url);
    let base = effective_base.as_ref().unwrap_or(base_url);

    ParsedPage {
        title: extract_title(&document),
        canonical: extract_canonical(&document, base),
        links: extract_links(&document, base),
        nofollow: has_meta_nofollow(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_base_href(document: &Html, page_url: &Url) -> Option<Url> {
    let selector = Selector::parse("base[href]").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    page_url.join(href.trim()).ok()
}

fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel='canonical'][href]").ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

fn has_meta_nofollow(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return false;
    };

    document.select(&selector).any(|element| {
        let name = element.value().attr("name").unwrap_or("");
        let content = element.value().attr("content").unwrap_or("");
        name.eq_ignore_ascii_case("robots")
            && content
                .split(',')
                .any(|d| matches!(d.trim().to_ascii_lowercase().as_str(), "nofollow" | "none"))
    })
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
