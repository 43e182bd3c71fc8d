//! URL priority calculator
//!
//! Combines four signals into one score in [0, 1]:
//!
//! | Signal | Score | Default weight |
//! |--------|-------|----------------|
//! | Declared `<priority>` | as declared, 0.5 when absent | 0.4 |
//! | `<changefreq>` | always 1.0 … never 0.0, 0.5 when absent | 0.3 |
//! | `<lastmod>` recency | `2^(-age_days / half_life)`, 0.5 when absent | 0.2 |
//! | Path depth | `1 / (1 + segments)` | 0.1 |
//!
//! The weighted sum is divided by the total weight and clamped. The
//! reference time is an explicit input so a run scores every URL against
//! the same instant.

use crate::config::PriorityWeights;
use crate::sitemap::ChangeFrequency;
use chrono::{DateTime, Utc};

/// Score used for any signal the sitemap does not declare
pub const UNSPECIFIED_SCORE: f64 = 0.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Scores URLs with a fixed set of weights
#[derive(Debug, Clone)]
pub struct PriorityCalculator {
    weights: PriorityWeights,
}

impl Default for PriorityCalculator {
    fn default() -> Self {
        Self::new(PriorityWeights::default())
    }
}

impl PriorityCalculator {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    /// Calculates the priority of one URL
    ///
    /// # Arguments
    ///
    /// * `declared` - Declared priority, already clamped to [0, 1]
    /// * `changefreq` - Declared change frequency
    /// * `lastmod` - Declared last modification time
    /// * `url_depth` - Number of non-empty path segments
    /// * `as_of` - Reference time for recency
    ///
    /// # Returns
    ///
    /// A score in [0, 1]. Identical inputs always give identical scores.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use seo_discovery::discovery::PriorityCalculator;
    ///
    /// let calculator = PriorityCalculator::default();
    /// let score = calculator.calculate(Some(0.8), None, None, 1, Utc::now());
    /// assert!(score > 0.0 && score < 1.0);
    /// ```
    pub fn calculate(
        &self,
        declared: Option<f64>,
        changefreq: Option<ChangeFrequency>,
        lastmod: Option<DateTime<Utc>>,
        url_depth: usize,
        as_of: DateTime<Utc>,
    ) -> f64 {
        let w = &self.weights;
        let total = w.total();
        if total <= 0.0 {
            return UNSPECIFIED_SCORE;
        }

        let declared = declared
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(UNSPECIFIED_SCORE);

        let sum = w.declared * declared
            + w.changefreq * changefreq_score(changefreq)
            + w.recency * recency_score(lastmod, as_of, w.recency_half_life_days)
            + w.depth * depth_score(url_depth);

        (sum / total).clamp(0.0, 1.0)
    }
}

/// Maps a change frequency onto [0, 1]
pub fn changefreq_score(changefreq: Option<ChangeFrequency>) -> f64 {
    match changefreq {
        Some(ChangeFrequency::Always) => 1.0,
        Some(ChangeFrequency::Hourly) => 0.9,
        Some(ChangeFrequency::Daily) => 0.8,
        Some(ChangeFrequency::Weekly) => 0.6,
        Some(ChangeFrequency::Monthly) => 0.4,
        Some(ChangeFrequency::Yearly) => 0.2,
        Some(ChangeFrequency::Never) => 0.0,
        None => UNSPECIFIED_SCORE,
    }
}

/// Exponential decay of the lastmod age; future dates count as age zero
pub fn recency_score(
    lastmod: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
    half_life_days: f64,
) -> f64 {
    let Some(lastmod) = lastmod else {
        return UNSPECIFIED_SCORE;
    };

    let age_days = ((as_of - lastmod).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
    2f64.powf(-age_days / half_life_days)
}

/// Shallow paths score higher; the site root scores 1.0
pub fn depth_score(url_depth: usize) -> f64 {
    1.0 / (1.0 + url_depth as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const EPSILON: f64 = 1e-9;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_all_unspecified_at_root() {
        let score = PriorityCalculator::default().calculate(None, None, None, 0, as_of());
        // 0.4*0.5 + 0.3*0.5 + 0.2*0.5 + 0.1*1.0
        assert!((score - 0.55).abs() < EPSILON);
    }

    #[test]
    fn test_maximum_score() {
        let score = PriorityCalculator::default().calculate(
            Some(1.0),
            Some(ChangeFrequency::Always),
            Some(as_of()),
            0,
            as_of(),
        );
        assert!((score - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_score_stays_in_range() {
        let calculator = PriorityCalculator::default();
        let old = as_of() - Duration::days(10_000);

        let low = calculator.calculate(
            Some(0.0),
            Some(ChangeFrequency::Never),
            Some(old),
            50,
            as_of(),
        );
        assert!((0.0..=1.0).contains(&low));
        assert!(low < 0.01);

        // Out-of-range declared values are clamped rather than trusted
        let high = calculator.calculate(Some(7.0), None, None, 0, as_of());
        assert!(high <= 1.0);
    }

    #[test]
    fn test_is_deterministic() {
        let calculator = PriorityCalculator::default();
        let lastmod = Some(as_of() - Duration::days(3));
        let a = calculator.calculate(Some(0.7), Some(ChangeFrequency::Daily), lastmod, 2, as_of());
        let b = calculator.calculate(Some(0.7), Some(ChangeFrequency::Daily), lastmod, 2, as_of());
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_recency_half_life() {
        let lastmod = as_of() - Duration::days(30);
        assert!((recency_score(Some(lastmod), as_of(), 30.0) - 0.5).abs() < EPSILON);
        assert!((recency_score(Some(as_of()), as_of(), 30.0) - 1.0).abs() < EPSILON);
        assert_eq!(recency_score(None, as_of(), 30.0), UNSPECIFIED_SCORE);
    }

    #[test]
    fn test_future_lastmod_counts_as_now() {
        let future = as_of() + Duration::days(400);
        assert!((recency_score(Some(future), as_of(), 30.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_newer_and_shallower_rank_higher() {
        let calculator = PriorityCalculator::default();
        let fresh = calculator.calculate(None, None, Some(as_of() - Duration::days(1)), 1, as_of());
        let stale = calculator.calculate(None, None, Some(as_of() - Duration::days(300)), 1, as_of());
        assert!(fresh > stale);

        let shallow = calculator.calculate(None, None, None, 1, as_of());
        let deep = calculator.calculate(None, None, None, 4, as_of());
        assert!(shallow > deep);
    }

    #[test]
    fn test_changefreq_scale() {
        assert_eq!(changefreq_score(Some(ChangeFrequency::Always)), 1.0);
        assert_eq!(changefreq_score(Some(ChangeFrequency::Weekly)), 0.6);
        assert_eq!(changefreq_score(Some(ChangeFrequency::Never)), 0.0);
        assert_eq!(changefreq_score(None), 0.5);
    }

    #[test]
    fn test_custom_weights_are_normalized() {
        let weights = PriorityWeights {
            declared: 2.0,
            changefreq: 0.0,
            recency: 0.0,
            depth: 0.0,
            recency_half_life_days: 30.0,
        };
        let score = PriorityCalculator::new(weights).calculate(Some(0.3), None, None, 5, as_of());
        assert!((score - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_depth_score() {
        assert_eq!(depth_score(0), 1.0);
        assert_eq!(depth_score(1), 0.5);
        assert_eq!(depth_score(3), 0.25);
    }
}
