//! Recursive sitemap resolver
//!
//! Walks the sitemap graph of one site breadth-first:
//!
//! 1. Seed the frontier with robots.txt `Sitemap:` URLs and the well-known
//!    locations (entry sitemaps are at depth 1)
//! 2. Fetch and parse every sitemap of a level concurrently
//! 3. Enqueue children of parsed indexes at depth + 1, guarding against
//!    cycles and the depth ceiling
//! 4. Accumulate the entries of parsed urlsets
//! 5. Stop when the frontier is empty or the run budget is spent
//!
//! Failures of individual sitemaps are recorded and never abort the run.

use crate::config::ResolverConfig;
use crate::discovery::merge::{Contribution, UrlAccumulator};
use crate::discovery::report::{
    ParsingError, ReportWarning, ResolverStatistics, WarningKind,
};
use crate::robots;
use crate::sitemap::fetcher::{FetchFailure, FetchedSitemap, SitemapFetch};
use crate::sitemap::parser::parse_sitemap;
use crate::sitemap::types::{
    ParsedSitemap, SitemapContent, SitemapDocument, SitemapIndexEntry, SitemapNode,
};
use crate::url::normalize_url;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Output of a resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolvedSitemaps {
    /// Every sitemap that was fetched, in breadth-first order
    pub discovered_sitemaps: Vec<String>,
    /// Top-level index trees
    pub sitemap_indexes: Vec<SitemapIndexEntry>,
    pub sitemaps: Vec<SitemapDocument>,
    /// Entries of every parsed urlset, merged by normalized URL
    pub urls: UrlAccumulator,
    pub statistics: ResolverStatistics,
    pub parsing_errors: Vec<ParsingError>,
    pub warnings: Vec<ReportWarning>,
}

/// A sitemap waiting to be fetched
#[derive(Debug, Clone)]
struct FrontierItem {
    url: String,
    depth: usize,
    parent: Option<String>,
    /// Well-known location guessed rather than declared anywhere
    speculative: bool,
}

/// What processing one frontier item produced
#[derive(Debug)]
enum NodeOutcome {
    Parsed {
        document: SitemapDocument,
        parsed: ParsedSitemap,
    },
    Failed {
        document: SitemapDocument,
        error: ParsingError,
    },
    /// A speculative probe found nothing
    Absent,
}

/// Mutable state of one run, touched only between levels
#[derive(Default)]
struct RunState {
    visited: HashSet<String>,
    parent_of: HashMap<String, Option<String>>,
    declared_children: HashMap<String, Vec<String>>,
    fetched_children: HashMap<String, Vec<String>>,
    documents: Vec<SitemapDocument>,
    urls: UrlAccumulator,
    parsing_errors: Vec<ParsingError>,
    warnings: Vec<ReportWarning>,
    ordinal: u64,
    cycles_detected: usize,
    depth_limited: usize,
    budget_exhausted: bool,
}

/// Resolves the sitemaps of a site into documents, index trees and URLs
pub struct SitemapResolver {
    fetcher: Arc<dyn SitemapFetch>,
    config: ResolverConfig,
}

impl SitemapResolver {
    pub fn new(fetcher: Arc<dyn SitemapFetch>, config: ResolverConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves every sitemap reachable from the site's entry points
    ///
    /// Uses the configured run budget. See [`SitemapResolver::resolve_until`].
    pub async fn resolve(&self, base_url: &Url, robots_content: Option<&str>) -> ResolvedSitemaps {
        let deadline = Instant::now() + self.config.run_budget();
        self.resolve_until(base_url, robots_content, deadline).await
    }

    /// Resolves every sitemap reachable from the site's entry points
    ///
    /// # Arguments
    ///
    /// * `base_url` - The site root, e.g. `https://example.com/`
    /// * `robots_content` - robots.txt body; fetched through the fetcher when `None`
    /// * `deadline` - No new fetch starts after this instant, and fetches still
    ///   running when it passes are recorded as timed out
    ///
    /// # Returns
    ///
    /// Everything found before the frontier emptied or the budget ran out.
    pub async fn resolve_until(
        &self,
        base_url: &Url,
        robots_content: Option<&str>,
        deadline: Instant,
    ) -> ResolvedSitemaps {
        let started = Instant::now();
        let mut state = RunState::default();

        // 1. Seed the frontier
        let fetched_robots;
        let robots_content = match robots_content {
            Some(content) => Some(content),
            None => {
                fetched_robots = robots::fetch_robots(self.fetcher.as_ref(), base_url).await;
                fetched_robots.as_deref()
            }
        };

        let mut frontier = self.seed_frontier(base_url, robots_content, &mut state);
        tracing::info!(
            "Resolving sitemaps for {} from {} entry point(s)",
            base_url,
            frontier.len()
        );

        let mut attempted = 0usize;
        let mut level = 1usize;

        // 2. Breadth-first, one level at a time
        while !frontier.is_empty() {
            if Instant::now() >= deadline {
                self.stop_for_budget(base_url, &mut state, frontier.len(), "time budget spent");
                break;
            }

            let capacity = self.config.max_sitemaps.saturating_sub(attempted);
            if capacity == 0 {
                self.stop_for_budget(base_url, &mut state, frontier.len(), "sitemap ceiling reached");
                break;
            }
            let deferred = if frontier.len() > capacity {
                frontier.split_off(capacity)
            } else {
                Vec::new()
            };
            attempted += frontier.len();

            tracing::info!("Level {}: fetching {} sitemap(s)", level, frontier.len());

            let outcomes = join_all(
                frontier
                    .iter()
                    .map(|item| self.process_node(item, deadline)),
            )
            .await;

            let mut next = Vec::new();
            for (item, outcome) in frontier.into_iter().zip(outcomes) {
                self.absorb_outcome(item, outcome, &mut state, &mut next);
            }

            if !deferred.is_empty() {
                self.stop_for_budget(base_url, &mut state, deferred.len(), "sitemap ceiling reached");
                break;
            }

            frontier = next;
            level += 1;
        }

        if Instant::now() >= deadline && !state.budget_exhausted {
            // Fetches were cut off mid-level
            self.stop_for_budget(base_url, &mut state, 0, "time budget spent");
        }

        self.finish(state, started)
    }

    /// Builds the depth-1 frontier from robots.txt and the well-known paths
    fn seed_frontier(
        &self,
        base_url: &Url,
        robots_content: Option<&str>,
        state: &mut RunState,
    ) -> Vec<FrontierItem> {
        let mut frontier = Vec::new();

        let declared = robots_content
            .map(|content| robots::extract_sitemap_urls(content, base_url))
            .unwrap_or_default();

        let well_known: Vec<String> = if self.config.probe_well_known {
            self.config
                .well_known_paths
                .iter()
                .filter_map(|path| base_url.join(path).ok())
                .map(|url| url.to_string())
                .collect()
        } else {
            Vec::new()
        };

        let candidates = declared
            .into_iter()
            .map(|url| (url, false))
            .chain(well_known.into_iter().map(|url| (url, true)));

        for (raw, speculative) in candidates {
            let url = match normalize_url(&raw).map(String::from) {
                Ok(url) => url,
                Err(e) => {
                    state.warnings.push(ReportWarning::new(
                        raw.as_str(),
                        WarningKind::InvalidUrl,
                        format!("unusable sitemap URL: {}", e),
                    ));
                    continue;
                }
            };

            if state.visited.insert(url.clone()) {
                state.parent_of.insert(url.clone(), None);
                frontier.push(FrontierItem {
                    url,
                    depth: 1,
                    parent: None,
                    speculative,
                });
            }
        }

        frontier
    }

    /// Fetches and parses one sitemap
    async fn process_node(&self, item: &FrontierItem, deadline: Instant) -> NodeOutcome {
        let fetched = tokio::time::timeout_at(deadline, self.fetch_with_retry(&item.url))
            .await
            .unwrap_or(Err(FetchFailure::Timeout));

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(FetchFailure::HttpError { status }) if item.speculative && status < 500 => {
                tracing::debug!("No sitemap at {} (HTTP {})", item.url, status);
                return NodeOutcome::Absent;
            }
            Err(failure) => {
                tracing::warn!("Failed to fetch sitemap {}: {}", item.url, failure);
                return NodeOutcome::Failed {
                    document: failed_document(item, &failure),
                    error: ParsingError::fetch(&item.url, &failure),
                };
            }
        };

        let parse_started = Instant::now();
        let result = parse_sitemap(&fetched.body);
        let parse_duration_ms = parse_started.elapsed().as_millis() as u64;

        let mut document = fetched_document(item, &fetched, parse_duration_ms);

        match result {
            Ok(parsed) => {
                document.sitemap_type = Some(parsed.sitemap_type);
                document.url_count = parsed.url_count();
                document.child_count = parsed.child_count();
                tracing::debug!(
                    "Parsed {} as {} ({} URLs, {} children)",
                    item.url,
                    parsed.sitemap_type,
                    document.url_count,
                    document.child_count
                );
                NodeOutcome::Parsed { document, parsed }
            }
            Err(_) if item.speculative => {
                // Soft 404: the probe answered with something that is not a sitemap
                tracing::debug!("No sitemap at {} (not sitemap XML)", item.url);
                NodeOutcome::Absent
            }
            Err(failure) => {
                tracing::warn!("Failed to parse sitemap {}: {}", item.url, failure);
                NodeOutcome::Failed {
                    document,
                    error: ParsingError::parse(&item.url, &failure),
                }
            }
        }
    }

    /// Fetches a URL, retrying transient failures
    async fn fetch_with_retry(&self, url: &str) -> Result<FetchedSitemap, FetchFailure> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch(url).await {
                Err(failure) if failure.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} after {} (attempt {} of {})",
                        url,
                        failure,
                        attempt,
                        self.config.max_retries
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                result => return result,
            }
        }
    }

    /// Folds one outcome into the run state and queues its children
    fn absorb_outcome(
        &self,
        item: FrontierItem,
        outcome: NodeOutcome,
        state: &mut RunState,
        next: &mut Vec<FrontierItem>,
    ) {
        let (document, parsed) = match outcome {
            NodeOutcome::Absent => return,
            NodeOutcome::Failed { document, error } => {
                state.documents.push(document);
                state.parsing_errors.push(error);
                return;
            }
            NodeOutcome::Parsed { document, parsed } => (document, parsed),
        };

        for warning in &parsed.warnings {
            state.warnings.push(ReportWarning::new(
                item.url.as_str(),
                warning.kind.into(),
                warning.detail.as_str(),
            ));
        }

        match parsed.content {
            SitemapContent::SitemapIndex { children } => {
                let mut declared = Vec::with_capacity(children.len());

                for child in children {
                    let child_url = match normalize_url(&child.loc).map(String::from) {
                        Ok(url) => url,
                        Err(e) => {
                            state.warnings.push(ReportWarning::new(
                                item.url.as_str(),
                                WarningKind::InvalidUrl,
                                format!("child sitemap '{}' skipped: {}", child.loc, e),
                            ));
                            continue;
                        }
                    };
                    declared.push(child_url.clone());

                    if state.visited.contains(&child_url) {
                        let relation = if is_ancestor(&state.parent_of, &child_url, &item.url) {
                            "references its ancestor"
                        } else {
                            "references an already resolved sitemap"
                        };
                        state.cycles_detected += 1;
                        tracing::warn!("Sitemap cycle: {} {} {}", item.url, relation, child_url);
                        state.warnings.push(ReportWarning::new(
                            child_url.as_str(),
                            WarningKind::CycleDetected,
                            format!("{} {}; skipped", item.url, relation),
                        ));
                        continue;
                    }

                    let child_depth = item.depth + 1;
                    if child_depth > self.config.max_depth {
                        state.depth_limited += 1;
                        state.warnings.push(ReportWarning::new(
                            child_url.as_str(),
                            WarningKind::DepthExceeded,
                            format!(
                                "depth {} exceeds max depth {} (referenced by {})",
                                child_depth, self.config.max_depth, item.url
                            ),
                        ));
                        continue;
                    }

                    state.visited.insert(child_url.clone());
                    state
                        .parent_of
                        .insert(child_url.clone(), Some(item.url.clone()));
                    state
                        .fetched_children
                        .entry(item.url.clone())
                        .or_default()
                        .push(child_url.clone());
                    next.push(FrontierItem {
                        url: child_url,
                        depth: child_depth,
                        parent: Some(item.url.clone()),
                        speculative: false,
                    });
                }

                state.declared_children.insert(item.url.clone(), declared);
            }
            SitemapContent::UrlSet { entries } => {
                for entry in entries {
                    let url = match normalize_url(&entry.loc).map(String::from) {
                        Ok(url) => url,
                        Err(e) => {
                            state.warnings.push(ReportWarning::new(
                                item.url.as_str(),
                                WarningKind::InvalidUrl,
                                format!("entry '{}' skipped: {}", entry.loc, e),
                            ));
                            continue;
                        }
                    };

                    let ordinal = state.ordinal;
                    state.ordinal += 1;
                    state.urls.add(Contribution::from_sitemap(
                        url, entry, &item.url, item.depth, ordinal,
                    ));
                }
            }
        }

        state.documents.push(document);
    }

    fn stop_for_budget(&self, base_url: &Url, state: &mut RunState, skipped: usize, why: &str) {
        state.budget_exhausted = true;
        tracing::warn!("Stopping sitemap resolution: {}", why);
        state.warnings.push(ReportWarning::new(
            base_url.as_str(),
            WarningKind::RunBudgetExceeded,
            format!("{}; {} queued sitemap(s) not fetched", why, skipped),
        ));
    }

    fn finish(&self, state: RunState, started: Instant) -> ResolvedSitemaps {
        let mut statistics = ResolverStatistics::default();
        statistics.record_documents(&state.documents);
        statistics.record_url_metadata(state.urls.iter());
        statistics.cycles_detected = state.cycles_detected;
        statistics.depth_limited = state.depth_limited;
        statistics.budget_exhausted = state.budget_exhausted;
        statistics.elapsed_ms = started.elapsed().as_millis() as u64;

        let by_url: HashMap<&str, &SitemapDocument> = state
            .documents
            .iter()
            .map(|d| (d.url.as_str(), d))
            .collect();

        let sitemap_indexes = state
            .documents
            .iter()
            .filter(|d| d.is_index() && d.parent.is_none())
            .map(|d| SitemapIndexEntry {
                url: d.url.clone(),
                depth: d.depth,
                children: state
                    .declared_children
                    .get(&d.url)
                    .cloned()
                    .unwrap_or_default(),
                sitemaps: build_nodes(&d.url, &state.fetched_children, &by_url),
            })
            .collect();

        tracing::info!(
            "Resolved {} sitemap(s): {} parsed, {} failed, {} URL(s)",
            statistics.sitemaps_found,
            statistics.sitemaps_parsed,
            statistics.sitemaps_failed,
            state.urls.len()
        );

        ResolvedSitemaps {
            discovered_sitemaps: state.documents.iter().map(|d| d.url.clone()).collect(),
            sitemap_indexes,
            sitemaps: state.documents,
            urls: state.urls,
            statistics,
            parsing_errors: state.parsing_errors,
            warnings: state.warnings,
        }
    }
}

/// Whether `candidate` is `node` or one of its ancestors
fn is_ancestor(parent_of: &HashMap<String, Option<String>>, candidate: &str, node: &str) -> bool {
    let mut current = Some(node);
    while let Some(url) = current {
        if url == candidate {
            return true;
        }
        current = parent_of.get(url).and_then(|p| p.as_deref());
    }
    false
}

/// Builds the resolved subtree below an index
///
/// Each fetched sitemap has exactly one parent, so the recursion ends.
fn build_nodes(
    parent: &str,
    fetched_children: &HashMap<String, Vec<String>>,
    by_url: &HashMap<&str, &SitemapDocument>,
) -> Vec<SitemapNode> {
    let Some(children) = fetched_children.get(parent) else {
        return Vec::new();
    };

    children
        .iter()
        .filter_map(|child| by_url.get(child.as_str()))
        .map(|doc| SitemapNode {
            url: doc.url.clone(),
            depth: doc.depth,
            sitemap_type: doc.sitemap_type,
            accessible: doc.accessible,
            url_count: doc.url_count,
            sitemaps: build_nodes(&doc.url, fetched_children, by_url),
        })
        .collect()
}

fn failed_document(item: &FrontierItem, failure: &FetchFailure) -> SitemapDocument {
    SitemapDocument {
        url: item.url.clone(),
        depth: item.depth,
        parent: item.parent.clone(),
        sitemap_type: None,
        accessible: false,
        http_status: failure.http_status(),
        content_hash: None,
        content_encoding: None,
        compressed_size: 0,
        uncompressed_size: 0,
        fetch_duration_ms: 0,
        parse_duration_ms: 0,
        url_count: 0,
        child_count: 0,
    }
}

fn fetched_document(
    item: &FrontierItem,
    fetched: &FetchedSitemap,
    parse_duration_ms: u64,
) -> SitemapDocument {
    SitemapDocument {
        url: item.url.clone(),
        depth: item.depth,
        parent: item.parent.clone(),
        sitemap_type: None,
        accessible: true,
        http_status: Some(fetched.status),
        content_hash: Some(hex::encode(Sha256::digest(&fetched.body))),
        content_encoding: Some(fetched.content_encoding),
        compressed_size: fetched.compressed_size,
        uncompressed_size: fetched.uncompressed_size,
        fetch_duration_ms: fetched.duration.as_millis() as u64,
        parse_duration_ms,
        url_count: 0,
        child_count: 0,
    }
}
