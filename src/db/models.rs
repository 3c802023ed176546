// Row types shared across the crate.
//
// Kept free of rusqlite so the clustering, composition, and output code
// can take these by value without pulling in the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A harvested topic, as stored. Fetchers create these; the clustering
/// run fills in cluster_id / rank_score / processed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    /// Originating platform: "reddit" or "x".
    pub source: String,
    /// Stable dedupe key, e.g. "reddit_abc123" or "x_17291".
    pub source_id: String,
    pub title: String,
    pub content: Option<String>,
    pub url: String,
    pub author: Option<String>,
    /// Platform-native popularity (upvotes, likes + 2x retweets).
    pub score: f64,
    /// Comment / reply+quote count.
    pub engagement: i64,
    pub hashtags: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    pub cluster_id: Option<i64>,
    pub rank_score: Option<f64>,
    pub processed: bool,
}

/// A topic as produced by a fetcher, before it has a row id.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub source: String,
    pub source_id: String,
    pub title: String,
    pub content: Option<String>,
    pub url: String,
    pub author: Option<String>,
    pub score: f64,
    pub engagement: i64,
    pub hashtags: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A generated LinkedIn draft and its publication state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPost {
    pub id: i64,
    /// Topic row ids this draft draws on (JSON-encoded in the DB).
    pub topic_ids: Vec<i64>,
    pub content: String,
    pub hook: Option<String>,
    pub insight: Option<String>,
    pub takeaway: Option<String>,
    pub cta: Option<String>,
    /// Source URLs credited at the end of the post (JSON-encoded in the DB).
    pub sources: Vec<String>,
    pub created_at: String,
    pub posted_at: Option<String>,
    pub status: PostStatus,
    pub linkedin_post_id: Option<String>,
    pub error_message: Option<String>,
}

/// Where a draft is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Queued,
    Posted,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Queued => "queued",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }

    /// Parse the stored status string; unknown values read as Queued
    /// so a bad row never takes down a listing.
    pub fn from_str(s: &str) -> Self {
        match s {
            "posted" => PostStatus::Posted,
            "failed" => PostStatus::Failed,
            _ => PostStatus::Queued,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of pipeline activity, shown by `kindling logs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub component: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_status_roundtrip() {
        for status in [PostStatus::Queued, PostStatus::Posted, PostStatus::Failed] {
            assert_eq!(PostStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_post_status_unknown_reads_as_queued() {
        assert_eq!(PostStatus::from_str("edited"), PostStatus::Queued);
        assert_eq!(PostStatus::from_str(""), PostStatus::Queued);
    }
}
