//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a discovery
//! run: sitemap inventory, source attribution, failures and the top of the
//! ranked URL list.

use crate::discovery::DiscoveryReport;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Number of ranked URLs listed in the summary
const TOP_URLS: usize = 20;

/// Generates a markdown summary of a report
///
/// # Arguments
///
/// * `report` - The discovery report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(report: &DiscoveryReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a report as markdown
pub fn format_markdown_summary(report: &DiscoveryReport) -> String {
    let stats = &report.statistics;
    let resolver = &stats.resolver;
    let mut md = String::new();

    md.push_str(&format!("# URL Discovery: {}\n\n", report.domain));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Generated**: {}\n",
        report.generated_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        stats.total_elapsed_ms as f64 / 1000.0
    ));
    if resolver.budget_exhausted {
        md.push_str("- **Run budget exhausted**: results are partial\n");
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total URLs**: {}\n", report.total_urls));
    md.push_str(&format!("- **Sitemaps Found**: {}\n", resolver.sitemaps_found));
    md.push_str(&format!("- **Sitemaps Parsed**: {}\n", resolver.sitemaps_parsed));
    md.push_str(&format!("- **Sitemaps Failed**: {}\n", resolver.sitemaps_failed));
    md.push_str(&format!(
        "- **Deepest Sitemap Level**: {}\n",
        resolver.max_depth_reached
    ));
    md.push_str(&format!("- **Crawled URLs**: {}\n\n", stats.crawled_urls));

    // Source attribution
    md.push_str("## URL Sources\n\n");
    md.push_str("| Source | URLs | Share |\n");
    md.push_str("|--------|------|-------|\n");
    for (label, count) in [
        ("Sitemap", &report.sources.sitemap),
        ("Crawl", &report.sources.crawl),
        ("Both", &report.sources.both),
    ] {
        md.push_str(&format!(
            "| {} | {} | {:.2}% |\n",
            label, count.count, count.percentage
        ));
    }
    md.push('\n');

    // Sitemap inventory
    if !report.sitemaps.is_empty() {
        md.push_str("## Sitemaps\n\n");
        md.push_str("| URL | Depth | Type | Status | URLs |\n");
        md.push_str("|-----|-------|------|--------|------|\n");
        for doc in &report.sitemaps {
            let kind = doc.sitemap_type.map(|t| t.as_str()).unwrap_or("-");
            let status = doc
                .http_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                doc.url, doc.depth, kind, status, doc.url_count
            ));
        }
        md.push('\n');
    }

    if !resolver.sitemap_types.is_empty() {
        md.push_str("## Sitemap Types\n\n");
        for (kind, count) in &resolver.sitemap_types {
            md.push_str(&format!("- {}: {}\n", kind, count));
        }
        md.push('\n');
    }

    // Failures
    if !report.parsing_errors.is_empty() {
        md.push_str("## Parsing Errors\n\n");
        md.push_str("| URL | Kind | Reason |\n");
        md.push_str("|-----|------|--------|\n");
        for error in &report.parsing_errors {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.url,
                error.kind.as_str(),
                error.reason
            ));
        }
        md.push('\n');
    }

    if !report.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in &report.warnings {
            md.push_str(&format!(
                "- **{:?}** {}: {}\n",
                warning.kind, warning.url, warning.detail
            ));
        }
        md.push('\n');
    }

    // Top of the ranking
    if !report.urls.is_empty() {
        md.push_str(&format!("## Top {} URLs\n\n", TOP_URLS));
        md.push_str("| # | URL | Score | Sources |\n");
        md.push_str("|---|-----|-------|---------|\n");
        for (rank, url) in report.urls.iter().take(TOP_URLS).enumerate() {
            let sources: Vec<&str> = url.sources.iter().map(|s| s.as_str()).collect();
            md.push_str(&format!(
                "| {} | {} | {:.3} | {} |\n",
                rank + 1,
                url.url,
                url.calculated_priority,
                sources.join(", ")
            ));
        }
        if report.urls.len() > TOP_URLS {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.urls.len() - TOP_URLS
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::sample_report;

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&sample_report());

        assert!(markdown.contains("# URL Discovery: example.com"));
        assert!(markdown.contains("Overall Statistics"));
        assert!(markdown.contains("- **Total URLs**: 2"));
        assert!(markdown.contains("- **Sitemaps Failed**: 1"));
        assert!(!markdown.contains("Run budget exhausted"));
    }

    #[test]
    fn test_markdown_lists_sources_and_failures() {
        let markdown = format_markdown_summary(&sample_report());

        assert!(markdown.contains("| Both | 1 | 50.00% |"));
        assert!(markdown.contains("| https://example.com/news.xml | HTTPError | HTTP 500 |"));
        assert!(markdown.contains("**MissingLoc**"));
        assert!(markdown.contains("| 1 | https://example.com/ | 0.930 | sitemap, crawl |"));
    }

    #[test]
    fn test_markdown_notes_partial_runs() {
        let mut report = sample_report();
        report.statistics.resolver.budget_exhausted = true;

        assert!(format_markdown_summary(&report).contains("Run budget exhausted"));
    }

    #[test]
    fn test_generate_markdown_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        generate_markdown_summary(&sample_report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# URL Discovery"));
    }
}
