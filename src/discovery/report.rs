//! Discovery report types
//!
//! The report is the single output of a discovery run. It is built once at
//! the end of the run and serialized to JSON by the output module.

use crate::discovery::merge::{DiscoverySource, MergedUrl};
use crate::sitemap::{
    ChangeFrequency, EntryExtensions, FetchFailure, ParseFailure, ParseWarningKind,
    SitemapDocument, SitemapIndexEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Histogram key for URLs without a declared value
pub const UNSPECIFIED_BUCKET: &str = "unspecified";

/// Declared-priority histogram buckets, lowest first
pub const PRIORITY_BUCKETS: [&str; 5] = ["0.0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

/// Kind of a per-sitemap failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unreachable,
    Timeout,
    #[serde(rename = "HTTPError")]
    HttpError,
    TooLarge,
    #[serde(rename = "MalformedXML")]
    MalformedXml,
    UnknownRootElement,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "Unreachable",
            Self::Timeout => "Timeout",
            Self::HttpError => "HTTPError",
            Self::TooLarge => "TooLarge",
            Self::MalformedXml => "MalformedXML",
            Self::UnknownRootElement => "UnknownRootElement",
        }
    }
}

impl From<&FetchFailure> for ErrorKind {
    fn from(failure: &FetchFailure) -> Self {
        match failure {
            FetchFailure::Unreachable { .. } => Self::Unreachable,
            FetchFailure::Timeout => Self::Timeout,
            FetchFailure::HttpError { .. } => Self::HttpError,
            FetchFailure::TooLarge { .. } => Self::TooLarge,
            FetchFailure::CorruptGzip { .. } => Self::MalformedXml,
        }
    }
}

impl From<&ParseFailure> for ErrorKind {
    fn from(failure: &ParseFailure) -> Self {
        match failure {
            ParseFailure::MalformedXml { .. } => Self::MalformedXml,
            ParseFailure::UnknownRootElement { .. } => Self::UnknownRootElement,
        }
    }
}

/// A sitemap that could not be fetched or parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingError {
    pub url: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl ParsingError {
    pub fn fetch(url: &str, failure: &FetchFailure) -> Self {
        Self {
            url: url.to_string(),
            kind: failure.into(),
            reason: failure.to_string(),
        }
    }

    pub fn parse(url: &str, failure: &ParseFailure) -> Self {
        Self {
            url: url.to_string(),
            kind: failure.into(),
            reason: failure.to_string(),
        }
    }
}

/// Kind of a non-fatal condition recorded during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    CycleDetected,
    DepthExceeded,
    RunBudgetExceeded,
    MissingLoc,
    PriorityClamped,
    InvalidUrl,
    CrawlFailed,
}

impl From<ParseWarningKind> for WarningKind {
    fn from(kind: ParseWarningKind) -> Self {
        match kind {
            ParseWarningKind::MissingLoc => Self::MissingLoc,
            ParseWarningKind::PriorityClamped => Self::PriorityClamped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWarning {
    pub url: String,
    pub kind: WarningKind,
    pub detail: String,
}

impl ReportWarning {
    pub fn new(url: impl Into<String>, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Statistics of the sitemap resolution phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverStatistics {
    pub sitemaps_found: usize,
    pub sitemaps_parsed: usize,
    pub sitemaps_failed: usize,
    pub max_depth_reached: usize,
    /// Distinct URLs found in sitemaps
    pub sitemap_urls: usize,
    pub sitemap_types: BTreeMap<String, usize>,
    pub priority_distribution: BTreeMap<String, usize>,
    pub changefreq_distribution: BTreeMap<String, usize>,
    pub cycles_detected: usize,
    pub depth_limited: usize,
    pub budget_exhausted: bool,
    pub elapsed_ms: u64,
}

impl ResolverStatistics {
    /// Fills the document counters and the type histogram
    pub fn record_documents(&mut self, documents: &[SitemapDocument]) {
        self.sitemaps_found = documents.len();
        self.sitemaps_parsed = documents.iter().filter(|d| d.parsed()).count();
        self.sitemaps_failed = self.sitemaps_found - self.sitemaps_parsed;
        self.max_depth_reached = documents.iter().map(|d| d.depth).max().unwrap_or(0);

        self.sitemap_types.clear();
        for ty in documents.iter().filter_map(|d| d.sitemap_type) {
            *self.sitemap_types.entry(ty.as_str().to_string()).or_insert(0) += 1;
        }
    }

    /// Fills the priority and changefreq histograms
    ///
    /// Every bucket is present, even when empty, so reports from different
    /// runs line up.
    pub fn record_url_metadata<'a>(&mut self, urls: impl Iterator<Item = &'a MergedUrl>) {
        self.priority_distribution = PRIORITY_BUCKETS
            .iter()
            .chain(std::iter::once(&UNSPECIFIED_BUCKET))
            .map(|b| (b.to_string(), 0))
            .collect();
        self.changefreq_distribution = ChangeFrequency::ALL
            .iter()
            .map(|c| c.as_str())
            .chain(std::iter::once(UNSPECIFIED_BUCKET))
            .map(|b| (b.to_string(), 0))
            .collect();

        let mut count = 0;
        for merged in urls {
            count += 1;
            let priority_key = priority_bucket(merged.best.priority);
            *self
                .priority_distribution
                .entry(priority_key.to_string())
                .or_insert(0) += 1;

            let changefreq_key = merged
                .best
                .changefreq
                .map(|c| c.as_str())
                .unwrap_or(UNSPECIFIED_BUCKET);
            *self
                .changefreq_distribution
                .entry(changefreq_key.to_string())
                .or_insert(0) += 1;
        }
        self.sitemap_urls = count;
    }
}

/// Histogram bucket of a declared priority
///
/// Buckets are half-open except the last, which includes 1.0.
pub fn priority_bucket(priority: Option<f64>) -> &'static str {
    match priority {
        None => UNSPECIFIED_BUCKET,
        Some(p) => {
            let index = ((p.clamp(0.0, 1.0) * 5.0).floor() as usize).min(PRIORITY_BUCKETS.len() - 1);
            PRIORITY_BUCKETS[index]
        }
    }
}

/// A URL in the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    /// Declared priority
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
    pub source_sitemap: Option<String>,
    pub calculated_priority: f64,
    pub sources: Vec<DiscoverySource>,
    /// Number of path segments
    pub depth: usize,
    #[serde(flatten)]
    pub extensions: EntryExtensions,
}

impl DiscoveredUrl {
    pub fn from_merged(merged: MergedUrl, calculated_priority: f64, depth: usize) -> Self {
        let best = merged.best;
        Self {
            url: best.url,
            priority: best.priority,
            changefreq: best.changefreq,
            lastmod: best.lastmod,
            source_sitemap: best.source_sitemap,
            calculated_priority,
            sources: merged.sources.into_iter().collect(),
            depth,
            extensions: best.extensions,
        }
    }

    pub fn from_sitemap(&self) -> bool {
        self.sources.contains(&DiscoverySource::Sitemap)
    }

    pub fn from_crawl(&self) -> bool {
        self.sources.contains(&DiscoverySource::Crawl)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub count: usize,
    pub percentage: f64,
}

/// Per-source attribution of the final URL set
///
/// `sitemap` and `crawl` count every URL the source found, so a URL found by
/// both is counted in both and again in `both`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub sitemap: SourceCount,
    pub crawl: SourceCount,
    pub both: SourceCount,
}

impl SourceBreakdown {
    pub fn from_urls(urls: &[DiscoveredUrl]) -> Self {
        let total = urls.len();
        let sitemap = urls.iter().filter(|u| u.from_sitemap()).count();
        let crawl = urls.iter().filter(|u| u.from_crawl()).count();
        let both = urls
            .iter()
            .filter(|u| u.from_sitemap() && u.from_crawl())
            .count();

        Self {
            sitemap: source_count(sitemap, total),
            crawl: source_count(crawl, total),
            both: source_count(both, total),
        }
    }
}

fn source_count(count: usize, total: usize) -> SourceCount {
    let percentage = if total == 0 {
        0.0
    } else {
        // Two decimals
        (count as f64 * 10_000.0 / total as f64).round() / 100.0
    };
    SourceCount { count, percentage }
}

/// Statistics of a whole discovery run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryStatistics {
    #[serde(flatten)]
    pub resolver: ResolverStatistics,
    /// Distinct URLs returned by the crawl
    pub crawled_urls: usize,
    pub total_elapsed_ms: u64,
}

/// Result of one discovery run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub domain: String,
    /// Reference time used for recency scoring
    pub generated_at: DateTime<Utc>,
    pub discovered_sitemaps: Vec<String>,
    pub sitemap_indexes: Vec<SitemapIndexEntry>,
    pub sitemaps: Vec<SitemapDocument>,
    /// Ranked by calculated priority, highest first, then by URL
    pub urls: Vec<DiscoveredUrl>,
    pub total_urls: usize,
    pub sources: SourceBreakdown,
    pub statistics: DiscoveryStatistics,
    pub parsing_errors: Vec<ParsingError>,
    pub warnings: Vec<ReportWarning>,
}

impl DiscoveryReport {
    pub fn errors_of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ParsingError> {
        self.parsing_errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn warnings_of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &ReportWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn url(&self, url: &str) -> Option<&DiscoveredUrl> {
        self.urls.iter().find(|u| u.url == url)
    }
}
