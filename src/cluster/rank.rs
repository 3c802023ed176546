// Composite rank score formula.
//
// A topic's quality blends three signals: how central it is to its cluster
// (cosine similarity to the center), how fresh it is (hyperbolic decay on
// age), and how much traction it has (log-compressed engagement, capped so
// a single viral item cannot dominate the ranking).

/// Configurable weights for the rank score formula.
///
/// `rank = similarity_weight * sim
///       + recency_weight * 1/(1 + age_hours)
///       + engagement_weight * min(ln(1 + score + engagement) / cap, 1)`
///
/// Every term is non-negative, so rank scores never go below zero.
#[derive(Debug, Clone)]
pub struct RankWeights {
    /// Weight on cluster cohesion (default 0.3)
    pub similarity: f64,
    /// Weight on freshness (default 0.3)
    pub recency: f64,
    /// Weight on traction (default 0.4)
    pub engagement: f64,
    /// Log-scale divisor before the engagement term saturates at 1
    /// (default 10.0 — about e^10 ~ 22k combined score+comments).
    pub engagement_cap: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            similarity: 0.3,
            recency: 0.3,
            engagement: 0.4,
            engagement_cap: 10.0,
        }
    }
}

/// Cosine similarity between two vectors. Zero vectors compare as 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Hyperbolic freshness decay: 1.0 at fetch time, 0.5 after an hour,
/// ~0.04 after a day. Ages are clamped at zero so clock skew between the
/// fetcher and the run cannot inflate a score.
pub fn recency_factor(age_hours: f64) -> f64 {
    1.0 / (1.0 + age_hours.max(0.0))
}

/// Log-compressed traction, scaled into [0, 1]. The raw sum is clamped at
/// zero first — a downvoted item contributes nothing rather than a
/// negative (or NaN) term.
pub fn engagement_factor(score: f64, engagement: i64, cap: f64) -> f64 {
    let raw = (score + engagement as f64).max(0.0);
    (raw.ln_1p() / cap).min(1.0)
}

/// Blend the three signals into the final rank score.
pub fn compute_rank_score(
    weights: &RankWeights,
    similarity: f64,
    age_hours: f64,
    score: f64,
    engagement: i64,
) -> f64 {
    weights.similarity * similarity
        + weights.recency * recency_factor(age_hours)
        + weights.engagement * engagement_factor(score, engagement, weights.engagement_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_topic() {
        let weights = RankWeights::default();
        let rank = compute_rank_score(&weights, 0.8, 2.0, 150.0, 25);
        // 0.3*0.8 + 0.3*(1/3) + 0.4*min(ln(176)/10, 1)
        //   = 0.24 + 0.1 + 0.4*0.5170484 = 0.5468194
        assert!((rank - 0.5468194).abs() < 1e-6, "got {rank}");
    }

    #[test]
    fn test_engagement_saturates() {
        let weights = RankWeights::default();
        // ln(1_000_001) ~ 13.8 — the scaled term caps at 1.0
        let factor = engagement_factor(1_000_000.0, 0, weights.engagement_cap);
        assert!((factor - 1.0).abs() < f64::EPSILON);

        let rank = compute_rank_score(&weights, 0.0, 0.0, 1_000_000.0, 0);
        // 0.3*0 + 0.3*1 + 0.4*1 = 0.7
        assert!((rank - 0.7).abs() < 1e-9, "got {rank}");
    }

    #[test]
    fn test_downvoted_item_contributes_nothing() {
        let weights = RankWeights::default();
        let factor = engagement_factor(-5.0, 2, weights.engagement_cap);
        assert_eq!(factor, 0.0);

        // Even all-negative inputs keep the score at or above zero
        let rank = compute_rank_score(&weights, 0.0, 1000.0, -50.0, 0);
        assert!(rank >= 0.0);
        assert!(rank < 0.001, "got {rank}");
    }

    #[test]
    fn test_recency_decays() {
        assert!((recency_factor(0.0) - 1.0).abs() < f64::EPSILON);
        assert!((recency_factor(1.0) - 0.5).abs() < f64::EPSILON);
        assert!((recency_factor(2.0) - recency_factor(1.0)) < 0.0);
        // Future timestamps (negative age) clamp to the maximum
        assert!((recency_factor(-3.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cosine_similarity_range() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);

        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_fresher_peer_ranks_higher() {
        let weights = RankWeights::default();
        let fresh = compute_rank_score(&weights, 0.5, 1.0, 100.0, 10);
        let old = compute_rank_score(&weights, 0.5, 5.0, 100.0, 10);
        assert!(fresh > old);
    }

    #[test]
    fn test_more_engaged_peer_ranks_higher() {
        let weights = RankWeights::default();
        let hot = compute_rank_score(&weights, 0.5, 2.0, 200.0, 35);
        let cold = compute_rank_score(&weights, 0.5, 2.0, 90.0, 12);
        assert!(hot > cold);
    }
}
