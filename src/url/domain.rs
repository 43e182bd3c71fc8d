use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_discovery::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Builds the base URL a discovery run works against
///
/// Callers hand over either a bare host (`example.com`) or an absolute base
/// URL (`http://127.0.0.1:8080`). A bare host is assumed to be served over
/// HTTPS. Path, query and fragment are discarded so that well-known sitemap
/// paths and `robots.txt` resolve against the site root.
///
/// # Returns
///
/// * `Ok(Url)` - The site root, always ending in `/`
/// * `Err(UrlError)` - The domain is empty, unparsable or not HTTP(S)
pub fn base_url_for_domain(domain: &str) -> UrlResult<Url> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_end_matches('/'))
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Checks whether `candidate` belongs to the site rooted at `base_host`
///
/// The bare domain, its `www.` variant and any subdomain all count as
/// internal. Comparison is case-insensitive.
///
/// ```
/// use seo_discovery::url::is_internal_host;
///
/// assert!(is_internal_host("example.com", "www.example.com"));
/// assert!(is_internal_host("www.example.com", "blog.example.com"));
/// assert!(!is_internal_host("example.com", "example.org"));
/// ```
pub fn is_internal_host(base_host: &str, candidate: &str) -> bool {
    let base = base_host.to_lowercase();
    let base = base.strip_prefix("www.").unwrap_or(&base);
    let candidate = candidate.to_lowercase();

    candidate == base || candidate.ends_with(&format!(".{}", base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_base_url_from_bare_host() {
        let url = base_url_for_domain("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_base_url_keeps_scheme_and_port() {
        let url = base_url_for_domain("http://127.0.0.1:4000/some/page?x=1").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:4000/");
    }

    #[test]
    fn test_base_url_rejects_empty() {
        assert!(matches!(
            base_url_for_domain("  "),
            Err(UrlError::MissingDomain)
        ));
    }

    #[test]
    fn test_base_url_rejects_other_scheme() {
        assert!(matches!(
            base_url_for_domain("ftp://example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_internal_subdomains() {
        assert!(is_internal_host("example.com", "example.com"));
        assert!(is_internal_host("example.com", "shop.example.com"));
        assert!(is_internal_host("EXAMPLE.com", "api.v2.example.COM"));
    }

    #[test]
    fn test_external_lookalike() {
        assert!(!is_internal_host("example.com", "notexample.com"));
        assert!(!is_internal_host("example.com", "example.com.evil.net"));
    }
}
