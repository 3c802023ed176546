// Database traits — async interfaces over the synchronous query layer.
//
// `Database` is the app-wide facade: fetchers, jobs, CLI and status all go
// through it. `TopicStore` is the narrow contract the clustering engine
// depends on — eligible-batch load plus the atomic score commit — with a
// typed error so the engine's hard-fail path is visible in signatures and
// easy to fake in tests.
//
// All methods are async so the rusqlite backend (sync, behind a Mutex)
// fits behind the same interface as any future native-async store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{DraftPost, JobLogEntry, NewTopic, PostStatus, Topic};

/// Commit of a scored batch (or the load before it) failed. The engine
/// propagates this to its caller after rollback instead of swallowing it.
#[derive(Debug, Clone, Error)]
#[error("persistence failed: {message}")]
pub struct PersistenceError {
    pub message: String,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One staged mutation from a clustering run. `processed` is implied:
/// applying an update always sets it true.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub topic_id: i64,
    pub cluster_id: i64,
    pub rank_score: f64,
}

/// Storage contract of the clustering engine.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Topics with `fetched_at >= cutoff` and `processed = false`, in a
    /// stable order (insertion order for the SQLite backend).
    async fn eligible_topics(&self, cutoff: DateTime<Utc>) -> Result<Vec<Topic>, PersistenceError>;

    /// Apply all updates atomically: cluster_id, rank_score, processed=true
    /// per topic, one transaction. On error nothing is applied.
    async fn commit_scores(&self, updates: &[ScoreUpdate]) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Number of user tables, reported by `init`.
    async fn table_count(&self) -> Result<i64>;

    // --- Topics ---

    /// Insert a fetched topic; returns false if source_id already exists.
    async fn insert_topic(&self, topic: &NewTopic) -> Result<bool>;

    async fn topic_count(&self) -> Result<i64>;

    async fn unprocessed_topic_count(&self) -> Result<i64>;

    /// Processed topics ranked by rank_score descending (post candidates).
    async fn top_ranked_topics(&self, limit: u32) -> Result<Vec<Topic>>;

    /// Load specific topics by row id (explicit `generate --topic-id` runs).
    async fn topics_by_ids(&self, ids: &[i64]) -> Result<Vec<Topic>>;

    // --- Posts ---

    /// Save a freshly generated draft (status queued); returns its id.
    async fn insert_draft(
        &self,
        topic_ids: &[i64],
        content: &str,
        hook: &str,
        insight: &str,
        takeaway: &str,
        cta: &str,
        sources: &[String],
    ) -> Result<i64>;

    async fn get_post(&self, id: i64) -> Result<Option<DraftPost>>;

    async fn mark_post_posted(&self, id: i64, linkedin_post_id: &str) -> Result<()>;

    async fn mark_post_failed(&self, id: i64, error_message: &str) -> Result<()>;

    async fn count_posts_with_status(&self, status: PostStatus) -> Result<i64>;

    async fn post_count(&self) -> Result<i64>;

    /// Posts created at or after the given instant (daily cap check).
    async fn posts_created_since(&self, since: DateTime<Utc>) -> Result<i64>;

    // --- Settings ---

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    // --- Job log ---

    async fn log_activity(&self, level: &str, component: &str, message: &str) -> Result<()>;

    async fn recent_logs(&self, limit: u32) -> Result<Vec<JobLogEntry>>;
}
