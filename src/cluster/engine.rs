// Clustering run orchestrator.
//
// One run is the whole read-cluster-rank-commit cycle over the fresh topic
// window. The engine owns nothing but a store handle and its config; the
// caller supplies the clock, which keeps runs reproducible under test.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cluster::kmeans;
use crate::cluster::rank;
use crate::cluster::shortlist::{select_shortlist, ScoredTopic, ShortlistEntry};
use crate::cluster::vectorize::BatchVectorizer;
use crate::cluster::ClusterConfig;
use crate::db::traits::{PersistenceError, ScoreUpdate, TopicStore};

/// Drives clustering runs against an injected topic store.
///
/// Runs are serialized through an internal lock, so overlapping scheduler
/// ticks queue up instead of racing on the same unprocessed batch.
pub struct ClusterEngine {
    store: Arc<dyn TopicStore>,
    config: ClusterConfig,
    run_lock: Mutex<()>,
}

impl ClusterEngine {
    pub fn new(store: Arc<dyn TopicStore>, config: ClusterConfig) -> Self {
        Self {
            store,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Execute one clustering run at the given instant.
    ///
    /// Loads unprocessed topics inside the freshness window, vectorizes and
    /// clusters them, commits cluster assignments and rank scores in one
    /// transaction, and returns the shortlist.
    ///
    /// Two outcomes intentionally leave the store untouched and return an
    /// empty shortlist: a batch below the minimum size, and a batch whose
    /// text yields no usable vocabulary. Storage failures propagate instead,
    /// so the caller can tell "nothing to do" from "run lost".
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<ShortlistEntry>, PersistenceError> {
        let _guard = self.run_lock.lock().await;

        let cutoff = now - Duration::hours(self.config.window_hours);
        let topics = self.store.eligible_topics(cutoff).await?;

        if topics.len() < self.config.min_batch {
            info!(
                count = topics.len(),
                min = self.config.min_batch,
                "Not enough fresh topics, skipping run"
            );
            return Ok(Vec::new());
        }

        let texts: Vec<String> = topics
            .iter()
            .map(|t| match &t.content {
                Some(body) => format!("{} {}", t.title, body),
                None => t.title.clone(),
            })
            .collect();

        let vectorizer = BatchVectorizer::new(self.config.max_features);
        let vectors = match vectorizer.fit_transform(&texts) {
            Ok(vectors) => vectors,
            Err(e) => {
                // Recoverable: the batch stays unprocessed for the next run
                warn!(count = topics.len(), error = %e, "Vectorization failed, batch left untouched");
                return Ok(Vec::new());
            }
        };

        let k = self.config.choose_k(topics.len());
        let clustering = kmeans::cluster(&vectors, k, kmeans::DEFAULT_SEED);

        let mut updates = Vec::with_capacity(topics.len());
        let mut scored = Vec::with_capacity(topics.len());
        for (i, topic) in topics.iter().enumerate() {
            let cluster_id = clustering.assignments[i];
            let similarity =
                rank::cosine_similarity(&vectors[i], &clustering.centers[cluster_id]);
            let age_hours = (now - topic.fetched_at).num_seconds() as f64 / 3600.0;
            let rank_score = rank::compute_rank_score(
                &self.config.weights,
                similarity,
                age_hours,
                topic.score,
                topic.engagement,
            );

            updates.push(ScoreUpdate {
                topic_id: topic.id,
                cluster_id: cluster_id as i64,
                rank_score,
            });
            scored.push(ScoredTopic {
                topic_id: topic.id,
                title: topic.title.clone(),
                source: topic.source.clone(),
                url: topic.url.clone(),
                cluster_id,
                rank_score,
            });
        }

        self.store.commit_scores(&updates).await?;
        info!(topics = topics.len(), clusters = k, "Clustering run committed");

        Ok(select_shortlist(scored, self.config.top_per_cluster))
    }
}
