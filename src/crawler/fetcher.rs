//! Page fetcher for the link crawler
//!
//! Redirects are followed by the client; the final URL is reported so the
//! crawler records where a page actually lives.

use reqwest::{header, Client};

/// Largest HTML body the crawler reads
const MAX_HTML_BYTES: usize = 10 * 1024 * 1024;

/// Result of a page fetch
#[derive(Debug)]
pub enum PageFetch {
    /// An HTML page
    Html {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// A successful response that is not HTML (PDF, image, ...)
    NonHtml {
        final_url: String,
        status_code: u16,
        content_type: String,
    },

    /// Non-2xx response
    HttpError { status_code: u16 },

    /// Network error (connection refused, timeout, etc.)
    NetworkError { error: String },
}

impl PageFetch {
    /// Final URL of a successful fetch
    pub fn final_url(&self) -> Option<&str> {
        match self {
            Self::Html { final_url, .. } | Self::NonHtml { final_url, .. } => Some(final_url),
            Self::HttpError { .. } | Self::NetworkError { .. } => None,
        }
    }
}

/// Fetches a page and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with `text/html` or `application/xhtml+xml` | `Html` |
/// | 2xx with any other Content-Type | `NonHtml` (body not read) |
/// | non-2xx | `HttpError` |
/// | timeout, connection failure | `NetworkError` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
pub async fn fetch_page(client: &Client, url: &str) -> PageFetch {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            return PageFetch::NetworkError { error };
        }
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return PageFetch::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    // A missing Content-Type is treated as HTML
    let is_html = content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml");

    if !is_html {
        return PageFetch::NonHtml {
            final_url,
            status_code: status.as_u16(),
            content_type,
        };
    }

    match response.bytes().await {
        Ok(bytes) => {
            let bytes = &bytes[..bytes.len().min(MAX_HTML_BYTES)];
            PageFetch::Html {
                final_url,
                status_code: status.as_u16(),
                body: String::from_utf8_lossy(bytes).into_owned(),
            }
        }
        Err(e) => PageFetch::NetworkError {
            error: e.to_string(),
        },
    }
}
