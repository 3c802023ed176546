// Draft publishing.
//
// Takes a queued draft through one publish attempt and records the result:
// posted with the returned URN, or failed with the error message. Already
// published drafts are refused so a retried job cannot double-post.

pub mod linkedin;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::db::models::PostStatus;
use crate::db::traits::Database;

/// Anything that can push post text to an external feed and return the
/// created post's id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn create_post(&self, text: &str) -> Result<String>;
}

/// Outcome of a successful publish.
#[derive(Debug)]
pub struct PublishOutcome {
    pub post_urn: String,
    pub feed_url: String,
}

/// LinkedIn has no canonical URN-to-URL API; the feed update route works
/// for ugcPost URNs.
pub fn feed_url(post_urn: &str) -> String {
    format!("https://www.linkedin.com/feed/update/{post_urn}")
}

/// Publish one queued draft.
///
/// On success the draft is marked posted. On a publish failure the draft is
/// marked failed with the error message, then the error propagates so the
/// caller sees the attempt went wrong.
pub async fn publish_draft(
    db: &dyn Database,
    publisher: &dyn Publisher,
    post_id: i64,
) -> Result<PublishOutcome> {
    let post = db
        .get_post(post_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post {} not found", post_id))?;

    if post.status == PostStatus::Posted {
        anyhow::bail!("Post {} was already published", post_id);
    }

    match publisher.create_post(&post.content).await {
        Ok(post_urn) => {
            db.mark_post_posted(post_id, &post_urn).await?;
            info!(post_id = post_id, urn = post_urn.as_str(), "Published draft");
            Ok(PublishOutcome {
                feed_url: feed_url(&post_urn),
                post_urn,
            })
        }
        Err(e) => {
            db.mark_post_failed(post_id, &format!("{e:#}")).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::db::sqlite::SqliteDatabase;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    async fn seed_draft(db: &SqliteDatabase) -> i64 {
        db.insert_draft(
            &[1],
            "Draft body",
            "hook",
            "insight",
            "takeaway",
            "cta",
            &["https://reddit.com/x".to_string()],
        )
        .await
        .unwrap()
    }

    struct StubPublisher {
        result: Mutex<Option<Result<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubPublisher {
        fn ok(urn: &str) -> Self {
            Self {
                result: Mutex::new(Some(Ok(urn.to_string()))),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                result: Mutex::new(Some(Err(anyhow::anyhow!("{}", message)))),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Publisher for StubPublisher {
        async fn create_post(&self, text: &str) -> Result<String> {
            self.calls.lock().unwrap().push(text.to_string());
            self.result.lock().unwrap().take().unwrap()
        }
    }

    #[tokio::test]
    async fn test_publish_marks_posted() {
        let db = test_db();
        let id = seed_draft(&db).await;
        let publisher = StubPublisher::ok("urn:li:share:123");

        let outcome = publish_draft(&db, &publisher, id).await.unwrap();

        assert_eq!(outcome.post_urn, "urn:li:share:123");
        assert_eq!(
            outcome.feed_url,
            "https://www.linkedin.com/feed/update/urn:li:share:123"
        );
        assert_eq!(publisher.calls.lock().unwrap()[0], "Draft body");

        let post = db.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Posted);
        assert_eq!(post.linkedin_post_id.as_deref(), Some("urn:li:share:123"));
        assert!(post.posted_at.is_some());
    }

    #[tokio::test]
    async fn test_publish_failure_marks_failed_and_propagates() {
        let db = test_db();
        let id = seed_draft(&db).await;
        let publisher = StubPublisher::failing("LinkedIn API returned 401: expired");

        let result = publish_draft(&db, &publisher, id).await;
        assert!(result.is_err());

        let post = db.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Failed);
        assert!(post.error_message.unwrap().contains("401"));
        assert!(post.posted_at.is_none());
    }

    #[tokio::test]
    async fn test_publish_refuses_already_posted() {
        let db = test_db();
        let id = seed_draft(&db).await;
        db.mark_post_posted(id, "urn:li:share:1").await.unwrap();

        let publisher = StubPublisher::ok("urn:li:share:2");
        let result = publish_draft(&db, &publisher, id).await;

        assert!(result.is_err());
        assert_eq!(publisher.call_count(), 0);
        // original urn untouched
        let post = db.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.linkedin_post_id.as_deref(), Some("urn:li:share:1"));
    }

    #[tokio::test]
    async fn test_publish_missing_post() {
        let db = test_db();
        let publisher = StubPublisher::ok("urn:li:share:9");

        let result = publish_draft(&db, &publisher, 42).await;
        assert!(result.is_err());
        assert_eq!(publisher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_draft_can_retry() {
        let db = test_db();
        let id = seed_draft(&db).await;
        db.mark_post_failed(id, "transient").await.unwrap();

        let publisher = StubPublisher::ok("urn:li:share:7");
        let outcome = publish_draft(&db, &publisher, id).await.unwrap();
        assert_eq!(outcome.post_urn, "urn:li:share:7");

        let post = db.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Posted);
        assert!(post.error_message.is_none());
    }
}
