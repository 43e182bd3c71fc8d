//! URL discovery
//!
//! Combines the sitemap resolver and the crawl collaborator into one ranked
//! URL set per site.

pub mod merge;
pub mod priority;
pub mod report;
mod service;

pub use merge::{Contribution, DiscoverySource, MergedUrl, UrlAccumulator};
pub use priority::PriorityCalculator;
pub use report::{
    DiscoveredUrl, DiscoveryReport, DiscoveryStatistics, ErrorKind, ParsingError, ReportWarning,
    ResolverStatistics, SourceBreakdown, SourceCount, WarningKind,
};
pub use service::DiscoveryService;
