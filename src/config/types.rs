use serde::Deserialize;
use std::time::Duration;

/// Well-known sitemap locations probed when seeding the resolver frontier
pub const DEFAULT_WELL_KNOWN_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/sitemaps.xml",
    "/sitemap/sitemap.xml",
    "/wp-sitemap.xml",
];

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub priority: PriorityWeights,
    pub output: OutputConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Sitemap fetcher limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum in-flight sitemap requests for a whole resolution run
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: usize,

    /// Ceiling for both the transferred and the decompressed body size
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Recursive sitemap resolution limits
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Deepest sitemap level that is fetched; entry sitemaps are level 1
    #[serde(rename = "max-depth", default = "default_resolver_max_depth")]
    pub max_depth: usize,

    /// Ceiling on the number of sitemaps fetched in one run
    #[serde(rename = "max-sitemaps", default = "default_max_sitemaps")]
    pub max_sitemaps: usize,

    /// Wall-clock budget for the whole discovery run, in seconds
    #[serde(rename = "run-budget-secs", default = "default_run_budget_secs")]
    pub run_budget_secs: u64,

    /// Extra attempts for transient failures (timeouts, 5xx, 429)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts, in milliseconds
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Whether to probe the well-known sitemap paths
    #[serde(rename = "probe-well-known", default = "default_true")]
    pub probe_well_known: bool,

    /// Paths probed relative to the site root
    #[serde(rename = "well-known-paths", default = "default_well_known_paths")]
    pub well_known_paths: Vec<String>,
}

impl ResolverConfig {
    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_resolver_max_depth(),
            max_sitemaps: default_max_sitemaps(),
            run_budget_secs: default_run_budget_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            probe_well_known: true,
            well_known_paths: default_well_known_paths(),
        }
    }
}

/// Bounds handed to the crawl collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Link depth from the home page; 0 crawls only the home page
    #[serde(rename = "max-depth", default = "default_crawl_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched, and of URLs the crawl returns
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Whether links to other hosts are reported
    #[serde(rename = "include-external", default)]
    pub include_external: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_crawl_max_depth(),
            max_pages: default_max_pages(),
            include_external: false,
        }
    }
}

/// Weights of the calculated-priority components
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityWeights {
    #[serde(rename = "declared-weight", default = "default_declared_weight")]
    pub declared: f64,

    #[serde(rename = "changefreq-weight", default = "default_changefreq_weight")]
    pub changefreq: f64,

    #[serde(rename = "recency-weight", default = "default_recency_weight")]
    pub recency: f64,

    #[serde(rename = "depth-weight", default = "default_depth_weight")]
    pub depth: f64,

    /// Age in days at which the recency score halves
    #[serde(rename = "recency-half-life-days", default = "default_half_life_days")]
    pub recency_half_life_days: f64,
}

impl PriorityWeights {
    pub fn total(&self) -> f64 {
        self.declared + self.changefreq + self.recency + self.depth
    }
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            declared: default_declared_weight(),
            changefreq: default_changefreq_weight(),
            recency: default_recency_weight(),
            depth: default_depth_weight(),
            recency_half_life_days: default_half_life_days(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON discovery report
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Optional markdown summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// Optional SQLite database for run history and sitemap snapshots
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_max_body_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_resolver_max_depth() -> usize {
    5
}

fn default_max_sitemaps() -> usize {
    1000
}

fn default_run_budget_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_well_known_paths() -> Vec<String> {
    DEFAULT_WELL_KNOWN_PATHS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_crawl_max_depth() -> u32 {
    3
}

fn default_max_pages() -> usize {
    500
}

fn default_declared_weight() -> f64 {
    0.4
}

fn default_changefreq_weight() -> f64 {
    0.3
}

fn default_recency_weight() -> f64 {
    0.2
}

fn default_depth_weight() -> f64 {
    0.1
}

fn default_half_life_days() -> f64 {
    30.0
}
