//! Multi-source URL merging
//!
//! Every sighting of a URL (a sitemap entry or a crawled link) becomes a
//! [`Contribution`]. Contributions for the same normalized URL collapse into
//! one [`MergedUrl`] whose metadata comes from the highest-precedence
//! contribution:
//!
//! 1. sitemap contributions beat crawl contributions
//! 2. among sitemap contributions, the shallowest sitemap wins
//! 3. remaining ties go to the first sighting in breadth-first order
//!
//! Precedence is a total order, so merging is commutative and associative:
//! the result does not depend on the order contributions arrive in.

use crate::sitemap::{ChangeFrequency, EntryExtensions, UrlEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Where a URL was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    Sitemap,
    Crawl,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitemap => "sitemap",
            Self::Crawl => "crawl",
        }
    }
}

/// One sighting of a URL
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Normalized URL
    pub url: String,
    pub source: DiscoverySource,
    /// Sitemap the entry came from; `None` for crawled links
    pub source_sitemap: Option<String>,
    /// Depth of the source sitemap, or of the page the link was found on
    pub depth: usize,
    /// Position in breadth-first discovery order
    pub ordinal: u64,
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFrequency>,
    pub lastmod: Option<DateTime<Utc>>,
    pub extensions: EntryExtensions,
}

impl Contribution {
    /// A contribution from a sitemap `<url>` entry
    pub fn from_sitemap(
        url: String,
        entry: UrlEntry,
        source_sitemap: &str,
        depth: usize,
        ordinal: u64,
    ) -> Self {
        Self {
            url,
            source: DiscoverySource::Sitemap,
            source_sitemap: Some(source_sitemap.to_string()),
            depth,
            ordinal,
            priority: entry.priority,
            changefreq: entry.changefreq,
            lastmod: entry.lastmod,
            extensions: entry.extensions,
        }
    }

    /// A contribution from the crawl, which carries no metadata
    pub fn from_crawl(url: String, depth: usize, ordinal: u64) -> Self {
        Self {
            url,
            source: DiscoverySource::Crawl,
            source_sitemap: None,
            depth,
            ordinal,
            priority: None,
            changefreq: None,
            lastmod: None,
            extensions: EntryExtensions::default(),
        }
    }

    /// Orders contributions so that the preferred one compares `Less`
    fn precedence(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then(self.depth.cmp(&other.depth))
            .then(self.ordinal.cmp(&other.ordinal))
            .then_with(|| self.source_sitemap.cmp(&other.source_sitemap))
    }
}

/// All contributions for one normalized URL, reduced to the winner
#[derive(Debug, Clone, PartialEq)]
pub struct MergedUrl {
    pub best: Contribution,
    pub sources: BTreeSet<DiscoverySource>,
}

impl MergedUrl {
    fn new(contribution: Contribution) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(contribution.source);
        Self {
            best: contribution,
            sources,
        }
    }

    pub fn url(&self) -> &str {
        &self.best.url
    }

    /// Whether both the sitemaps and the crawl found this URL
    pub fn in_both(&self) -> bool {
        self.sources.len() > 1
    }

    fn absorb(&mut self, other: MergedUrl) {
        self.sources.extend(other.sources);
        if other.best.precedence(&self.best) == Ordering::Less {
            self.best = other.best;
        }
    }
}

/// Set of discovered URLs keyed by normalized URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlAccumulator {
    urls: HashMap<String, MergedUrl>,
}

impl UrlAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one contribution
    ///
    /// # Returns
    ///
    /// `true` if the URL was not known yet
    pub fn add(&mut self, contribution: Contribution) -> bool {
        self.insert(MergedUrl::new(contribution))
    }

    /// Merges another accumulator into this one
    pub fn merge(&mut self, other: UrlAccumulator) {
        for merged in other.urls.into_values() {
            self.insert(merged);
        }
    }

    fn insert(&mut self, merged: MergedUrl) -> bool {
        match self.urls.get_mut(merged.url()) {
            Some(existing) => {
                existing.absorb(merged);
                false
            }
            None => {
                self.urls.insert(merged.url().to_string(), merged);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&MergedUrl> {
        self.urls.get(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergedUrl> {
        self.urls.values()
    }

    /// Consumes the accumulator, returning URLs sorted by URL
    pub fn into_sorted(self) -> Vec<MergedUrl> {
        let mut urls: Vec<MergedUrl> = self.urls.into_values().collect();
        urls.sort_by(|a, b| a.url().cmp(b.url()));
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sitemap(url: &str, sitemap: &str, depth: usize, ordinal: u64, day: u32) -> Contribution {
        let mut entry = UrlEntry::new(url);
        entry.lastmod = Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        Contribution::from_sitemap(url.to_string(), entry, sitemap, depth, ordinal)
    }

    fn fold(contributions: &[Contribution]) -> UrlAccumulator {
        let mut acc = UrlAccumulator::new();
        for c in contributions {
            acc.add(c.clone());
        }
        acc
    }

    #[test]
    fn test_same_url_merges_once() {
        let mut acc = UrlAccumulator::new();
        assert!(acc.add(sitemap("https://example.com/a", "https://example.com/s1.xml", 1, 0, 1)));
        assert!(!acc.add(Contribution::from_crawl(
            "https://example.com/a".to_string(),
            1,
            5
        )));

        assert_eq!(acc.len(), 1);
        let merged = acc.get("https://example.com/a").unwrap();
        assert!(merged.in_both());
        assert_eq!(merged.best.source, DiscoverySource::Sitemap);
    }

    #[test]
    fn test_sitemap_beats_crawl_regardless_of_order() {
        let crawl = Contribution::from_crawl("https://example.com/a".to_string(), 0, 0);
        let map = sitemap("https://example.com/a", "https://example.com/s.xml", 3, 99, 2);

        let a = fold(&[crawl.clone(), map.clone()]);
        let b = fold(&[map, crawl]);
        assert_eq!(a, b);
        assert_eq!(
            a.get("https://example.com/a").unwrap().best.source,
            DiscoverySource::Sitemap
        );
    }

    #[test]
    fn test_shallower_sitemap_wins() {
        let deep = sitemap("https://example.com/a", "https://example.com/deep.xml", 3, 1, 20);
        let shallow = sitemap("https://example.com/a", "https://example.com/top.xml", 1, 7, 5);

        let acc = fold(&[deep, shallow]);
        let best = &acc.get("https://example.com/a").unwrap().best;
        assert_eq!(best.source_sitemap.as_deref(), Some("https://example.com/top.xml"));
        assert_eq!(best.lastmod.unwrap().format("%d").to_string(), "05");
    }

    #[test]
    fn test_depth_tie_keeps_first_seen() {
        let first = sitemap("https://example.com/a", "https://example.com/x.xml", 2, 3, 1);
        let second = sitemap("https://example.com/a", "https://example.com/y.xml", 2, 8, 9);

        let acc = fold(&[second, first]);
        assert_eq!(
            acc.get("https://example.com/a").unwrap().best.source_sitemap.as_deref(),
            Some("https://example.com/x.xml")
        );
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let c = [
            sitemap("https://example.com/a", "https://example.com/1.xml", 2, 0, 1),
            sitemap("https://example.com/a", "https://example.com/2.xml", 1, 4, 2),
            Contribution::from_crawl("https://example.com/a".to_string(), 0, 1),
            sitemap("https://example.com/b", "https://example.com/1.xml", 2, 2, 3),
            Contribution::from_crawl("https://example.com/c".to_string(), 1, 3),
        ];

        let x = fold(&c[0..2]);
        let y = fold(&c[2..4]);
        let z = fold(&c[4..5]);

        // (x + y) + z
        let mut left = x.clone();
        left.merge(y.clone());
        left.merge(z.clone());

        // x + (y + z)
        let mut yz = y.clone();
        yz.merge(z.clone());
        let mut right = x.clone();
        right.merge(yz);

        // z + y + x
        let mut reversed = z;
        reversed.merge(y);
        reversed.merge(x);

        assert_eq!(left, right);
        assert_eq!(left, reversed);
        assert_eq!(left.len(), 3);
    }

    #[test]
    fn test_into_sorted() {
        let acc = fold(&[
            Contribution::from_crawl("https://example.com/z".to_string(), 0, 0),
            Contribution::from_crawl("https://example.com/a".to_string(), 0, 1),
        ]);
        let urls: Vec<_> = acc.into_sorted().into_iter().map(|m| m.best.url).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/z"]);
    }
}
