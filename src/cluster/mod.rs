// Topic clustering and ranking — the core of the pipeline.
//
// A run takes the eligible batch of harvested topics, vectorizes their text,
// partitions the vectors into thematic clusters, scores every item against
// its cluster center plus recency and engagement, persists the scores in one
// transaction, and returns a small ranked shortlist for post generation.

pub mod engine;
pub mod kmeans;
pub mod rank;
pub mod shortlist;
pub mod vectorize;

pub use engine::ClusterEngine;
pub use shortlist::ShortlistEntry;

use rank::RankWeights;

/// Knobs for a clustering run. The defaults are the pipeline's fixed
/// policy constants — tunable in principle, not derived from data.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Trailing eligibility window for fetched topics, in hours.
    pub window_hours: i64,
    /// Below this many eligible topics the run is skipped outright.
    pub min_batch: usize,
    /// Vocabulary cap for the vectorizer.
    pub max_features: usize,
    /// Target cluster count is n / k_divisor, clamped to [k_min, k_max].
    pub k_divisor: usize,
    pub k_min: usize,
    pub k_max: usize,
    /// How many items each cluster contributes to the shortlist.
    pub top_per_cluster: usize,
    pub weights: RankWeights,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            min_batch: 3,
            max_features: 100,
            k_divisor: 5,
            k_min: 3,
            k_max: 10,
            top_per_cluster: 2,
            weights: RankWeights::default(),
        }
    }
}

impl ClusterConfig {
    /// Cluster count for a batch of n items: roughly one cluster per
    /// `k_divisor` items, never fewer than `k_min` nor more than `k_max`.
    pub fn choose_k(&self, n: usize) -> usize {
        (n / self.k_divisor).clamp(self.k_min, self.k_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_k_clamps_low() {
        let config = ClusterConfig::default();
        // 5 items / 5 = 1, clamped up to 3
        assert_eq!(config.choose_k(5), 3);
        assert_eq!(config.choose_k(3), 3);
        assert_eq!(config.choose_k(14), 3);
    }

    #[test]
    fn test_choose_k_midrange() {
        let config = ClusterConfig::default();
        assert_eq!(config.choose_k(25), 5);
        assert_eq!(config.choose_k(34), 6);
    }

    #[test]
    fn test_choose_k_clamps_high() {
        let config = ClusterConfig::default();
        // 120 / 5 = 24, clamped down to 10
        assert_eq!(config.choose_k(120), 10);
        assert_eq!(config.choose_k(50), 10);
    }
}
