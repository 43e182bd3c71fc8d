//! URL handling module
//!
//! This module provides URL normalization (which defines URL identity for the
//! whole discovery run), domain extraction, site-membership checks and the
//! path-depth measure used by the priority calculator.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{base_url_for_domain, extract_domain, is_internal_host};
pub use normalize::normalize_url;

use ::url::Url;

/// Counts the non-empty path segments of a URL
///
/// The root page has depth 0, `/blog` has depth 1, `/blog/2024/post` has
/// depth 3. Trailing and repeated slashes do not add depth.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_discovery::url::url_depth;
///
/// assert_eq!(url_depth(&Url::parse("https://example.com/").unwrap()), 0);
/// assert_eq!(url_depth(&Url::parse("https://example.com/a/b/").unwrap()), 2);
/// ```
pub fn url_depth(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}
