//! Console statistics for a discovery run

use crate::discovery::DiscoveryReport;
use std::fmt::Write;

/// Formats the statistics block printed after a run
///
/// # Arguments
///
/// * `report` - The discovery report to summarize
pub fn format_statistics(report: &DiscoveryReport) -> String {
    let stats = &report.statistics;
    let resolver = &stats.resolver;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Discovery Statistics: {} ===\n", report.domain);

    let _ = writeln!(out, "Sitemaps:");
    let _ = writeln!(out, "  Found: {}", resolver.sitemaps_found);
    let _ = writeln!(out, "  Parsed: {}", resolver.sitemaps_parsed);
    let _ = writeln!(out, "  Failed: {}", resolver.sitemaps_failed);
    let _ = writeln!(out, "  Deepest level: {}", resolver.max_depth_reached);
    if resolver.cycles_detected > 0 {
        let _ = writeln!(out, "  Cycles detected: {}", resolver.cycles_detected);
    }
    if resolver.depth_limited > 0 {
        let _ = writeln!(out, "  Beyond depth limit: {}", resolver.depth_limited);
    }
    for (kind, count) in resolver.sitemap_types.iter().filter(|(_, c)| **c > 0) {
        let _ = writeln!(out, "  {}: {}", kind, count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "URLs:");
    let _ = writeln!(out, "  Total: {}", report.total_urls);
    let _ = writeln!(out, "  From sitemaps: {}", resolver.sitemap_urls);
    let _ = writeln!(out, "  From crawl: {}", stats.crawled_urls);
    for (label, count) in [
        ("sitemap", &report.sources.sitemap),
        ("crawl", &report.sources.crawl),
        ("both", &report.sources.both),
    ] {
        let _ = writeln!(
            out,
            "  Source {}: {} ({:.1}%)",
            label, count.count, count.percentage
        );
    }
    let _ = writeln!(out);

    if !report.parsing_errors.is_empty() {
        let _ = writeln!(out, "Parsing Errors ({}):", report.parsing_errors.len());
        for error in &report.parsing_errors {
            let _ = writeln!(out, "  {} {}: {}", error.kind.as_str(), error.url, error.reason);
        }
        let _ = writeln!(out);
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "Warnings: {}", report.warnings.len());
        let _ = writeln!(out);
    }

    if resolver.budget_exhausted {
        let _ = writeln!(out, "Run budget exhausted; the report is partial.");
    }

    let _ = write!(
        out,
        "Completed in {:.2}s",
        stats.total_elapsed_ms as f64 / 1000.0
    );
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(report: &DiscoveryReport) {
    println!("{}", format_statistics(report));
}
