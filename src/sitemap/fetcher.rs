//! Sitemap fetcher
//!
//! This module handles all HTTP requests made while resolving sitemaps:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Bounding in-flight requests with a semaphore shared by the whole run
//! - Enforcing the body size ceiling while streaming
//! - Detecting and decoding gzip bodies (`.xml.gz` files)
//! - Classifying failures

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::sitemap::types::ContentEncoding;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::ACCEPT_ENCODING;
use reqwest::{redirect::Policy, Client, ClientBuilder, StatusCode};
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;

/// Leading bytes of every gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// A successfully fetched sitemap body
#[derive(Debug, Clone)]
pub struct FetchedSitemap {
    /// URL the body was served from, after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Decompressed body
    pub body: Vec<u8>,
    /// Whether the body arrived gzip-compressed
    pub content_encoding: ContentEncoding,
    /// Bytes received on the wire
    pub compressed_size: u64,
    /// Bytes after decompression
    pub uncompressed_size: u64,
    /// Wall time of the request, including waiting for a permit
    pub duration: Duration,
}

/// Why a sitemap could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}")]
    HttpError { status: u16 },

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("corrupt gzip stream: {reason}")]
    CorruptGzip { reason: String },
}

impl FetchFailure {
    /// Whether a retry could plausibly succeed
    ///
    /// Timeouts, connection failures, 5xx responses and 429 are transient.
    /// Everything else is a property of the document and will not change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Unreachable { .. } => true,
            Self::HttpError { status } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::TooLarge { .. } | Self::CorruptGzip { .. } => false,
        }
    }

    /// HTTP status attached to the failure, if one was received
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status } => Some(*status),
            _ => None,
        }
    }
}

/// Source of sitemap bodies
///
/// The resolver only talks to this trait, so tests and alternative transports
/// can stand in for HTTP.
#[async_trait]
pub trait SitemapFetch: Send + Sync {
    /// Fetches one URL and returns its decompressed body
    async fn fetch(&self, url: &str) -> Result<FetchedSitemap, FetchFailure>;
}

/// Builds the HTTP client used for page and robots.txt requests
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetcher` - Timeouts for the client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use seo_discovery::config::{FetcherConfig, UserAgentConfig};
/// use seo_discovery::sitemap::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "SeoDiscovery".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    client_builder(user_agent, fetcher)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the client used for sitemap bodies
///
/// Automatic decompression is off: bodies reach [`decode_body`] exactly as
/// they came off the wire, so a `Content-Encoding: gzip` response is reported
/// as gzip with its real compressed size, and the size ceiling applies to
/// the decoded body too.
pub fn build_sitemap_client(
    user_agent: &UserAgentConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    client_builder(user_agent, fetcher)
        .gzip(false)
        .brotli(false)
        .build()
}

fn client_builder(user_agent: &UserAgentConfig, fetcher: &FetcherConfig) -> ClientBuilder {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(fetcher.timeout())
        .connect_timeout(fetcher.connect_timeout())
        .redirect(Policy::limited(10))
}

/// HTTP implementation of [`SitemapFetch`]
///
/// One instance is created per resolution run; its semaphore bounds the
/// number of requests in flight across every level of the sitemap tree.
#[derive(Debug, Clone)]
pub struct HttpSitemapFetcher {
    client: Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    max_body_bytes: u64,
}

impl HttpSitemapFetcher {
    /// Creates a fetcher with its own client and permit pool
    pub fn new(user_agent: &UserAgentConfig, config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_sitemap_client(user_agent, config)?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Number of requests that could start right now
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    async fn fetch_inner(&self, url: &str) -> Result<(String, u16, Vec<u8>), FetchFailure> {
        let mut response = self
            .client
            .get(url)
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchFailure::HttpError {
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes {
                return Err(FetchFailure::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        // Stream so an oversized body is cut off without buffering all of it
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify_reqwest_error)? {
            if body.len() as u64 + chunk.len() as u64 > self.max_body_bytes {
                return Err(FetchFailure::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok((final_url, status.as_u16(), body))
    }
}

#[async_trait]
impl SitemapFetch for HttpSitemapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedSitemap, FetchFailure> {
        let started = Instant::now();

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchFailure::Unreachable {
                reason: "fetcher is shut down".to_string(),
            })?;

        let (final_url, status, raw) = tokio::time::timeout(self.timeout, self.fetch_inner(url))
            .await
            .map_err(|_| FetchFailure::Timeout)??;

        let compressed_size = raw.len() as u64;
        let (body, content_encoding) = decode_body(raw, self.max_body_bytes)?;

        tracing::debug!(
            "Fetched {} ({} bytes on the wire, {} decoded)",
            url,
            compressed_size,
            body.len()
        );

        Ok(FetchedSitemap {
            final_url,
            status,
            uncompressed_size: body.len() as u64,
            body,
            content_encoding,
            compressed_size,
            duration: started.elapsed(),
        })
    }
}

/// Decompresses a body when it starts with the gzip magic bytes
///
/// Covers both `.xml.gz` files served as `application/gzip` and responses
/// sent with `Content-Encoding: gzip`; the sitemap client decodes neither.
///
/// # Arguments
///
/// * `raw` - The body as received
/// * `limit` - Ceiling for the decompressed size
pub fn decode_body(raw: Vec<u8>, limit: u64) -> Result<(Vec<u8>, ContentEncoding), FetchFailure> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok((raw, ContentEncoding::Identity));
    }

    let mut decoded = Vec::new();
    GzDecoder::new(raw.as_slice())
        .take(limit.saturating_add(1))
        .read_to_end(&mut decoded)
        .map_err(|e| FetchFailure::CorruptGzip {
            reason: e.to_string(),
        })?;

    if decoded.len() as u64 > limit {
        return Err(FetchFailure::TooLarge { limit });
    }

    Ok((decoded, ContentEncoding::Gzip))
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Unreachable {
            reason: "connection refused".to_string(),
        }
    } else if e.is_redirect() {
        FetchFailure::Unreachable {
            reason: "too many redirects".to_string(),
        }
    } else {
        FetchFailure::Unreachable {
            reason: e.to_string(),
        }
    }
}
