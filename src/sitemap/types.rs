//! Sitemap data model shared by the fetcher, parser and resolver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a sitemap document
///
/// Decided once at parse time from the root element and the extension
/// namespaces it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapType {
    Regular,
    Index,
    Image,
    Video,
    News,
    Mobile,
}

impl SitemapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Index => "index",
            Self::Image => "image",
            Self::Video => "video",
            Self::News => "news",
            Self::Mobile => "mobile",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "index" => Some(Self::Index),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "news" => Some(Self::News),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for SitemapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared `<changefreq>` of a sitemap entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub const ALL: [ChangeFrequency; 7] = [
        Self::Always,
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Yearly,
        Self::Never,
    ];

    /// Parses a changefreq value; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

/// A `<video:video>` extension block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_loc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_loc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_loc: Option<String>,
}

/// A `<news:news>` extension block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
}

/// Image, video, news and mobile extension metadata of one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryExtensions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<VideoInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<NewsInfo>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mobile: bool,
}

impl EntryExtensions {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.news.is_none() && !self.mobile
    }
}

/// One `<url>` entry of a urlset
#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntry {
    pub loc: String,
    /// Declared priority, already clamped to [0, 1]
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFrequency>,
    pub lastmod: Option<DateTime<Utc>>,
    pub extensions: EntryExtensions,
}

impl UrlEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            priority: None,
            changefreq: None,
            lastmod: None,
            extensions: EntryExtensions::default(),
        }
    }
}

/// One `<sitemap>` reference of a sitemap index
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRef {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Content of a parsed sitemap, decided by the root element
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapContent {
    UrlSet { entries: Vec<UrlEntry> },
    SitemapIndex { children: Vec<ChildRef> },
}

/// Kind of a non-fatal problem found while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseWarningKind {
    /// A `<url>` or `<sitemap>` element without `<loc>` was dropped
    MissingLoc,
    /// A declared priority outside [0, 1] was clamped
    PriorityClamped,
}

/// A non-fatal problem found while parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub kind: ParseWarningKind,
    pub detail: String,
}

/// Result of parsing one sitemap document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSitemap {
    pub sitemap_type: SitemapType,
    pub content: SitemapContent,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedSitemap {
    pub fn url_count(&self) -> usize {
        match &self.content {
            SitemapContent::UrlSet { entries } => entries.len(),
            SitemapContent::SitemapIndex { .. } => 0,
        }
    }

    pub fn child_count(&self) -> usize {
        match &self.content {
            SitemapContent::UrlSet { .. } => 0,
            SitemapContent::SitemapIndex { children } => children.len(),
        }
    }
}

/// How the body of a sitemap was encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

/// Snapshot of one sitemap fetch attempt
///
/// Immutable once built by the resolver. `sitemap_type` and `content_hash`
/// are absent when the document could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapDocument {
    pub url: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub sitemap_type: Option<SitemapType>,
    pub accessible: bool,
    pub http_status: Option<u16>,
    pub content_hash: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub fetch_duration_ms: u64,
    pub parse_duration_ms: u64,
    pub url_count: usize,
    pub child_count: usize,
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        self.sitemap_type == Some(SitemapType::Index)
    }

    pub fn parsed(&self) -> bool {
        self.sitemap_type.is_some()
    }
}

/// A resolved node of a sitemap-index tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapNode {
    pub url: String,
    pub depth: usize,
    pub sitemap_type: Option<SitemapType>,
    pub accessible: bool,
    pub url_count: usize,
    /// Resolved children; only non-empty for indexes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sitemaps: Vec<SitemapNode>,
}

/// A sitemap index with its declared children and the resolved subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapIndexEntry {
    pub url: String,
    pub depth: usize,
    /// Child URLs in document order, as declared
    pub children: Vec<String>,
    /// Children that were actually fetched in this run
    pub sitemaps: Vec<SitemapNode>,
}
