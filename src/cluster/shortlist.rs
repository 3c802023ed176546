// Shortlist selection: the best few topics from each cluster, merged into
// one globally ranked list. Taking per-cluster winners first keeps the
// shortlist diverse — one runaway theme cannot fill every slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A topic with its cluster assignment and rank score, before selection.
#[derive(Debug, Clone)]
pub struct ScoredTopic {
    pub topic_id: i64,
    pub title: String,
    pub source: String,
    pub url: String,
    pub cluster_id: usize,
    pub rank_score: f64,
}

/// One shortlist slot, ready for display or composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub id: i64,
    pub title: String,
    pub cluster_id: i64,
    pub rank_score: f64,
    pub source: String,
    pub url: String,
}

/// Pick the top `top_per_cluster` topics from each cluster, then re-sort the
/// union by rank score descending. Both sorts are stable, so topics with
/// equal scores keep their cluster-id then input order.
pub fn select_shortlist(scored: Vec<ScoredTopic>, top_per_cluster: usize) -> Vec<ShortlistEntry> {
    let mut by_cluster: BTreeMap<usize, Vec<ScoredTopic>> = BTreeMap::new();
    for topic in scored {
        by_cluster.entry(topic.cluster_id).or_default().push(topic);
    }

    let mut shortlist = Vec::new();
    for (_, mut members) in by_cluster {
        members.sort_by(|a, b| {
            b.rank_score
                .partial_cmp(&a.rank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for topic in members.into_iter().take(top_per_cluster) {
            shortlist.push(ShortlistEntry {
                id: topic.topic_id,
                title: topic.title,
                cluster_id: topic.cluster_id as i64,
                rank_score: topic.rank_score,
                source: topic.source,
                url: topic.url,
            });
        }
    }

    shortlist.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    shortlist
}
