//! seo-discovery main entry point
//!
//! This is the command-line interface for the SEO URL discovery engine.

use clap::Parser;
use seo_discovery::config::{load_config_with_hash, Config};
use seo_discovery::crawler::{CrawlSource, LinkCrawler, NoopCrawlSource};
use seo_discovery::output::{generate_markdown_summary, print_statistics, write_json_report};
use seo_discovery::storage::{open_storage, persist_report};
use seo_discovery::{base_url_for_domain, DiscoveryService};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// seo-discovery: find every URL of a site worth scanning
///
/// Resolves the site's sitemap tree (robots.txt declarations, well-known
/// locations, nested indexes, gzip), crawls internal links, merges both and
/// writes one ranked JSON report.
#[derive(Parser, Debug)]
#[command(name = "seo-discovery")]
#[command(version = "1.0.0")]
#[command(about = "SEO URL discovery engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Domain or base URL to discover (example.com, https://example.com)
    #[arg(value_name = "DOMAIN")]
    domain: String,

    /// Read robots.txt from a file instead of fetching it
    #[arg(long, value_name = "FILE")]
    robots: Option<PathBuf>,

    /// Write the JSON report here instead of output.report-path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only use sitemaps; skip the link crawl
    #[arg(long)]
    no_crawl: bool,

    /// Validate config and show what would be done without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli)?;
    } else {
        handle_discover(config, &config_hash, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seo_discovery=info,warn"),
            1 => EnvFilter::new("seo_discovery=debug,info"),
            2 => EnvFilter::new("seo_discovery=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn report_path(config: &Config, cli: &Cli) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.report_path))
}

/// Handles the --dry-run mode: validates config and shows what would be done
fn handle_dry_run(config: &Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = base_url_for_domain(&cli.domain)?;

    println!("=== seo-discovery Dry Run ===\n");
    println!("Site: {}", base_url);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Connect timeout: {}s", config.fetcher.connect_timeout_secs);
    println!(
        "  Max concurrent requests: {}",
        config.fetcher.max_concurrent_requests
    );
    println!("  Max body size: {} bytes", config.fetcher.max_body_bytes);

    println!("\nResolver:");
    println!("  Max depth: {}", config.resolver.max_depth);
    println!("  Max sitemaps: {}", config.resolver.max_sitemaps);
    println!("  Run budget: {}s", config.resolver.run_budget_secs);
    println!("  Retries: {}", config.resolver.max_retries);
    match &cli.robots {
        Some(path) => println!("  robots.txt: {}", path.display()),
        None => println!("  robots.txt: {}robots.txt", base_url),
    }
    if config.resolver.probe_well_known {
        println!("  Well-known locations:");
        for path in &config.resolver.well_known_paths {
            println!("    * {}", path);
        }
    }

    if cli.no_crawl {
        println!("\nCrawl: disabled");
    } else {
        println!("\nCrawl:");
        println!("  Max depth: {}", config.crawl.max_depth);
        println!("  Max pages: {}", config.crawl.max_pages);
        println!("  Include external: {}", config.crawl.include_external);
    }

    println!("\nOutput:");
    println!("  Report: {}", report_path(config, cli).display());
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }
    if let Some(database) = &config.output.database_path {
        println!("  Database: {}", database);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main discovery run
async fn handle_discover(
    config: Config,
    config_hash: &str,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let robots = match &cli.robots {
        Some(path) => {
            tracing::info!("Reading robots.txt from {}", path.display());
            Some(std::fs::read_to_string(path)?)
        }
        None => None,
    };

    let crawler: Box<dyn CrawlSource> = if cli.no_crawl {
        Box::new(NoopCrawlSource)
    } else {
        Box::new(LinkCrawler::new(&config.user_agent, &config.fetcher)?)
    };

    let report_path = report_path(&config, cli);
    let summary_path = config.output.summary_path.clone();
    let database_path = config.output.database_path.clone();
    let crawl_config = config.crawl.clone();

    let service = DiscoveryService::new(config);
    let report = match service
        .discover(&cli.domain, robots.as_deref(), &crawl_config, crawler.as_ref())
        .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            return Err(e.into());
        }
    };

    write_json_report(&report, &report_path)?;

    if let Some(summary_path) = summary_path {
        generate_markdown_summary(&report, Path::new(&summary_path))?;
        tracing::info!("Wrote summary to {}", summary_path);
    }

    if let Some(database_path) = database_path {
        let mut storage = open_storage(Path::new(&database_path))?;
        let persisted = persist_report(&mut storage, &report, config_hash)?;
        let changed = persisted.changed().count();
        if changed > 0 {
            tracing::info!("{} sitemap(s) new or changed since the last run", changed);
        }
    }

    if !cli.quiet {
        print_statistics(&report);
    }

    Ok(())
}
