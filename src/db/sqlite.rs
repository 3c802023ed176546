// SqliteDatabase — rusqlite backend implementing the Database and
// TopicStore traits.
//
// rusqlite's Connection is synchronous and single-threaded, so it sits
// behind a tokio::sync::Mutex; each trait method locks, runs its query,
// and releases before returning. No lock is held across an .await.
//
// The free functions in queries.rs remain usable directly against a
// Connection, which is what the in-module tests do.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{DraftPost, JobLogEntry, NewTopic, PostStatus, Topic};
use super::traits::{Database, PersistenceError, ScoreUpdate, TopicStore};

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Take ownership of an opened connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl TopicStore for SqliteDatabase {
    async fn eligible_topics(&self, cutoff: DateTime<Utc>) -> Result<Vec<Topic>, PersistenceError> {
        let conn = self.conn.lock().await;
        super::queries::eligible_topics(&conn, cutoff)
            .map_err(|e| PersistenceError::new(format!("{e:#}")))
    }

    async fn commit_scores(&self, updates: &[ScoreUpdate]) -> Result<(), PersistenceError> {
        let mut conn = self.conn.lock().await;
        super::queries::commit_topic_scores(&mut conn, updates)
            .map_err(|e| PersistenceError::new(format!("{e:#}")))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_topic(&self, topic: &NewTopic) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::insert_topic(&conn, topic)
    }

    async fn topic_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::topic_count(&conn)
    }

    async fn unprocessed_topic_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::unprocessed_topic_count(&conn)
    }

    async fn top_ranked_topics(&self, limit: u32) -> Result<Vec<Topic>> {
        let conn = self.conn.lock().await;
        super::queries::top_ranked_topics(&conn, limit)
    }

    async fn topics_by_ids(&self, ids: &[i64]) -> Result<Vec<Topic>> {
        let conn = self.conn.lock().await;
        super::queries::topics_by_ids(&conn, ids)
    }

    async fn insert_draft(
        &self,
        topic_ids: &[i64],
        content: &str,
        hook: &str,
        insight: &str,
        takeaway: &str,
        cta: &str,
        sources: &[String],
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_draft(
            &conn, topic_ids, content, hook, insight, takeaway, cta, sources,
        )
    }

    async fn get_post(&self, id: i64) -> Result<Option<DraftPost>> {
        let conn = self.conn.lock().await;
        super::queries::get_post(&conn, id)
    }

    async fn mark_post_posted(&self, id: i64, linkedin_post_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::mark_post_posted(&conn, id, linkedin_post_id)
    }

    async fn mark_post_failed(&self, id: i64, error_message: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::mark_post_failed(&conn, id, error_message)
    }

    async fn count_posts_with_status(&self, status: PostStatus) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_posts_with_status(&conn, status)
    }

    async fn post_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::post_count(&conn)
    }

    async fn posts_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::posts_created_since(&conn, since)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_setting(&conn, key)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_setting(&conn, key, value)
    }

    async fn log_activity(&self, level: &str, component: &str, message: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::log_activity(&conn, level, component, message)
    }

    async fn recent_logs(&self, limit: u32) -> Result<Vec<JobLogEntry>> {
        let conn = self.conn.lock().await;
        super::queries::recent_logs(&conn, limit)
    }
}
