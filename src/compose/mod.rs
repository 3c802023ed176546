// Draft composition: turn ranked topics into a LinkedIn-ready draft.
//
// The model returns four sections (hook, insight, takeaway, cta) which are
// assembled with a source-attribution block into the final body. Drafts
// whose length falls outside the configured range get one regeneration
// attempt; the second result is kept either way, since model length drift
// is noise rather than a hard failure.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::models::Topic;
use crate::db::traits::Database;

/// The four sections of a generated post.
///
/// Missing sections deserialize as empty strings rather than failing the
/// whole draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostSections {
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub takeaway: String,
    #[serde(default)]
    pub cta: String,
}

/// Anything that can write a post from a set of topics.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, topics: &[Topic]) -> Result<PostSections>;
}

/// A draft that was saved to the posts table.
#[derive(Debug)]
pub struct GeneratedDraft {
    pub id: i64,
    pub content: String,
    pub char_count: usize,
}

/// Join the sections and append the attribution block.
pub fn assemble_content(sections: &PostSections, sources: &[String]) -> String {
    let attribution = if sources.is_empty() {
        String::new()
    } else {
        let bullets: Vec<String> = sources.iter().map(|url| format!("• {url}")).collect();
        format!("\n\nSources:\n{}", bullets.join("\n"))
    };

    format!(
        "{}\n\n{}\n\n{}\n\n{}{}",
        sections.hook, sections.insight, sections.takeaway, sections.cta, attribution
    )
}

/// Compose a draft from the given topics and save it as queued.
///
/// Fails if none of the ids resolve to stored topics. Composer errors
/// propagate; a finished draft is always saved, even when the retry could
/// not bring its length into range.
pub async fn generate_draft(
    db: &dyn Database,
    composer: &dyn Composer,
    topic_ids: &[i64],
    min_length: usize,
    max_length: usize,
) -> Result<GeneratedDraft> {
    let topics = db.topics_by_ids(topic_ids).await?;
    if topics.is_empty() {
        anyhow::bail!("No topics found for ids {:?}", topic_ids);
    }

    let sources: Vec<String> = topics.iter().map(|t| t.url.clone()).collect();

    let mut sections = composer.compose(&topics).await?;
    let mut content = assemble_content(&sections, &sources);
    let mut char_count = content.chars().count();

    if char_count < min_length || char_count > max_length {
        warn!(
            chars = char_count,
            min = min_length,
            max = max_length,
            "Draft length out of range, regenerating once"
        );
        sections = composer.compose(&topics).await?;
        content = assemble_content(&sections, &sources);
        char_count = content.chars().count();

        if char_count < min_length || char_count > max_length {
            warn!(chars = char_count, "Regenerated draft still out of range, keeping it");
        }
    }

    let id = db
        .insert_draft(
            topic_ids,
            &content,
            &sections.hook,
            &sections.insight,
            &sections.takeaway,
            &sections.cta,
            &sources,
        )
        .await?;

    info!(post_id = id, chars = char_count, "Draft saved");

    Ok(GeneratedDraft {
        id,
        content,
        char_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewTopic;
    use crate::db::schema;
    use crate::db::sqlite::SqliteDatabase;
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    async fn seed_topic(db: &SqliteDatabase, source_id: &str, title: &str) -> i64 {
        db.insert_topic(&NewTopic {
            source: "reddit".to_string(),
            source_id: source_id.to_string(),
            title: title.to_string(),
            content: Some("body".to_string()),
            url: format!("https://reddit.com/{source_id}"),
            author: Some("author".to_string()),
            score: 100.0,
            engagement: 10,
            hashtags: vec!["#androiddev".to_string()],
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();
        db.topic_count().await.unwrap()
    }

    /// Pops canned sections per call and counts invocations.
    struct StubComposer {
        responses: Mutex<Vec<PostSections>>,
        calls: Mutex<usize>,
    }

    impl StubComposer {
        fn new(responses: Vec<PostSections>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Composer for StubComposer {
        async fn compose(&self, _topics: &[Topic]) -> Result<PostSections> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn sections(filler: usize) -> PostSections {
        PostSections {
            hook: "Big news for Android developers".to_string(),
            insight: "i".repeat(filler),
            takeaway: "Try it in your next project".to_string(),
            cta: "What has your experience been?".to_string(),
        }
    }

    #[test]
    fn test_assemble_content_layout() {
        let content = assemble_content(
            &sections(10),
            &["https://a.example".to_string(), "https://b.example".to_string()],
        );

        assert!(content.starts_with("Big news for Android developers\n\n"));
        assert!(content.contains("\n\nSources:\n• https://a.example\n• https://b.example"));
    }

    #[test]
    fn test_assemble_content_without_sources() {
        let content = assemble_content(&sections(5), &[]);
        assert!(!content.contains("Sources:"));
        assert!(content.ends_with("What has your experience been?"));
    }

    #[tokio::test]
    async fn test_generate_draft_saves_queued_post() {
        let db = test_db();
        let id = seed_topic(&db, "reddit_a", "Compose stability").await;
        let composer = StubComposer::new(vec![sections(50)]);

        let draft = generate_draft(&db, &composer, &[id], 0, 10_000).await.unwrap();

        assert_eq!(composer.call_count(), 1);
        let post = db.get_post(draft.id).await.unwrap().unwrap();
        assert_eq!(post.content, draft.content);
        assert_eq!(post.topic_ids, vec![id]);
        assert_eq!(post.status, crate::db::models::PostStatus::Queued);
        assert!(post.content.contains("Sources:"));
    }

    #[tokio::test]
    async fn test_generate_draft_regenerates_once_on_short_output() {
        let db = test_db();
        let id = seed_topic(&db, "reddit_b", "Kotlin 2.0").await;
        // Both attempts come back too short; the second is kept anyway
        let composer = StubComposer::new(vec![sections(1), sections(2)]);

        let draft = generate_draft(&db, &composer, &[id], 5_000, 10_000).await.unwrap();

        assert_eq!(composer.call_count(), 2);
        assert!(db.get_post(draft.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_generate_draft_fails_on_unknown_topics() {
        let db = test_db();
        let composer = StubComposer::new(vec![sections(10)]);

        let result = generate_draft(&db, &composer, &[999], 0, 10_000).await;
        assert!(result.is_err());
        assert_eq!(composer.call_count(), 0);
        assert_eq!(db.post_count().await.unwrap(), 0);
    }
}
