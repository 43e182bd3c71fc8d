//! Sitemap module
//!
//! Fetching, parsing and recursive resolution of XML sitemaps, including
//! sitemap indexes, gzip-compressed files and the Google image, video, news
//! and mobile extensions.

mod fetcher;
mod parser;
mod resolver;
mod types;

pub use fetcher::{
    build_http_client, build_sitemap_client, decode_body, FetchFailure, FetchedSitemap,
    HttpSitemapFetcher, SitemapFetch,
};
pub use parser::{parse_lastmod, parse_sitemap, ParseFailure};
pub use resolver::{ResolvedSitemaps, SitemapResolver};
pub use types::{
    ChangeFrequency, ChildRef, ContentEncoding, EntryExtensions, NewsInfo, ParseWarning,
    ParseWarningKind, ParsedSitemap, SitemapContent, SitemapDocument, SitemapIndexEntry,
    SitemapNode, SitemapType, UrlEntry, VideoInfo,
};
