// All SQL lives here, as free functions over &Connection; the async traits
// in `traits.rs` wrap these for the rest of the app.
//
// Timestamps that participate in comparisons (topics.fetched_at,
// posts.created_at/posted_at) are stored as fixed-width RFC3339 UTC strings
// written by `format_timestamp`, so lexicographic comparison in SQL equals
// time comparison.

use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::models::{DraftPost, JobLogEntry, NewTopic, PostStatus, Topic};
use super::traits::ScoreUpdate;

/// Fixed-width RFC3339 UTC ("2026-08-25T04:05:06Z").
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

// --- Topics ---

const TOPIC_COLUMNS: &str = "id, source, source_id, title, content, url, author, score, \
                             engagement, hashtags, fetched_at, cluster_id, rank_score, processed";

fn topic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Topic> {
    let hashtags_json: Option<String> = row.get(9)?;
    let hashtags: Vec<String> = hashtags_json
        .as_deref()
        .and_then(|j| serde_json::from_str(j).ok())
        .unwrap_or_default();
    // A row with an unparseable fetch time fails the whole query — recency
    // math against a bad timestamp would silently corrupt the ranking.
    let fetched_raw: String = row.get(10)?;
    let fetched_at = parse_timestamp(&fetched_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Topic {
        id: row.get(0)?,
        source: row.get(1)?,
        source_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        url: row.get(5)?,
        author: row.get(6)?,
        score: row.get(7)?,
        engagement: row.get(8)?,
        hashtags,
        fetched_at,
        cluster_id: row.get(11)?,
        rank_score: row.get(12)?,
        processed: row.get(13)?,
    })
}

/// Insert a fetched topic, deduplicated on source_id.
/// Returns true if the row is new, false if the topic was already known.
pub fn insert_topic(conn: &Connection, topic: &NewTopic) -> Result<bool> {
    let hashtags_json = serde_json::to_string(&topic.hashtags)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO topics
            (source, source_id, title, content, url, author, score, engagement, hashtags, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            topic.source,
            topic.source_id,
            topic.title,
            topic.content,
            topic.url,
            topic.author,
            topic.score,
            topic.engagement,
            hashtags_json,
            format_timestamp(topic.fetched_at),
        ],
    )?;
    Ok(changed > 0)
}

pub fn topic_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM topics", [], |row| row.get(0))?;
    Ok(count)
}

pub fn unprocessed_topic_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM topics WHERE processed = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// The eligible batch for a clustering run: unprocessed topics fetched at
/// or after the cutoff, in insertion order (stable for tie-break tests).
pub fn eligible_topics(conn: &Connection, cutoff: DateTime<Utc>) -> Result<Vec<Topic>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics
         WHERE processed = 0 AND fetched_at >= ?1
         ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![format_timestamp(cutoff)], topic_from_row)?;

    let mut topics = Vec::new();
    for row in rows {
        topics.push(row?);
    }
    Ok(topics)
}

/// Apply a clustering run's staged mutations in one transaction.
///
/// Every update must hit exactly one row; an update that matches nothing
/// means the batch no longer reflects the table, and the whole commit is
/// rolled back.
pub fn commit_topic_scores(conn: &mut Connection, updates: &[ScoreUpdate]) -> Result<()> {
    let tx = conn.transaction()?;
    for update in updates {
        let changed = tx.execute(
            "UPDATE topics SET cluster_id = ?1, rank_score = ?2, processed = 1 WHERE id = ?3",
            params![update.cluster_id, update.rank_score, update.topic_id],
        )?;
        if changed != 1 {
            // Dropping the transaction rolls back everything applied so far.
            bail!("topic {} not found during score commit", update.topic_id);
        }
    }
    tx.commit()?;
    Ok(())
}

/// Processed topics by rank score descending — the post candidates.
pub fn top_ranked_topics(conn: &Connection, limit: u32) -> Result<Vec<Topic>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics
         WHERE processed = 1 AND rank_score IS NOT NULL
         ORDER BY rank_score DESC
         LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], topic_from_row)?;

    let mut topics = Vec::new();
    for row in rows {
        topics.push(row?);
    }
    Ok(topics)
}

/// Load topics by row id (for explicit `generate --topic-id` runs).
/// Unknown ids are simply absent from the result.
pub fn topics_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Topic>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {TOPIC_COLUMNS} FROM topics WHERE id IN ({placeholders}) ORDER BY id"
    ))?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), topic_from_row)?;

    let mut topics = Vec::new();
    for row in rows {
        topics.push(row?);
    }
    Ok(topics)
}

// --- Posts ---

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DraftPost> {
    let topic_ids_json: String = row.get(1)?;
    let topic_ids: Vec<i64> = serde_json::from_str(&topic_ids_json).unwrap_or_default();
    let sources_json: Option<String> = row.get(7)?;
    let sources: Vec<String> = sources_json
        .as_deref()
        .and_then(|j| serde_json::from_str(j).ok())
        .unwrap_or_default();
    let status_raw: String = row.get(10)?;
    Ok(DraftPost {
        id: row.get(0)?,
        topic_ids,
        content: row.get(2)?,
        hook: row.get(3)?,
        insight: row.get(4)?,
        takeaway: row.get(5)?,
        cta: row.get(6)?,
        sources,
        created_at: row.get(8)?,
        posted_at: row.get(9)?,
        status: PostStatus::from_str(&status_raw),
        linkedin_post_id: row.get(11)?,
        error_message: row.get(12)?,
    })
}

/// Save a freshly generated draft with status queued. Returns its id.
#[allow(clippy::too_many_arguments)]
pub fn insert_draft(
    conn: &Connection,
    topic_ids: &[i64],
    content: &str,
    hook: &str,
    insight: &str,
    takeaway: &str,
    cta: &str,
    sources: &[String],
) -> Result<i64> {
    let topic_ids_json = serde_json::to_string(topic_ids)?;
    let sources_json = serde_json::to_string(sources)?;
    conn.execute(
        "INSERT INTO posts
            (topic_ids, content, hook, insight, takeaway, cta, sources, created_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'queued')",
        params![
            topic_ids_json,
            content,
            hook,
            insight,
            takeaway,
            cta,
            sources_json,
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_post(conn: &Connection, id: i64) -> Result<Option<DraftPost>> {
    let mut stmt = conn.prepare(
        "SELECT id, topic_ids, content, hook, insight, takeaway, cta, sources,
                created_at, posted_at, status, linkedin_post_id, error_message
         FROM posts WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id], post_from_row).optional()?;
    Ok(result)
}

pub fn mark_post_posted(conn: &Connection, id: i64, linkedin_post_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE posts SET status = 'posted', posted_at = ?1, linkedin_post_id = ?2,
                          error_message = NULL
         WHERE id = ?3",
        params![format_timestamp(Utc::now()), linkedin_post_id, id],
    )?;
    Ok(())
}

pub fn mark_post_failed(conn: &Connection, id: i64, error_message: &str) -> Result<()> {
    conn.execute(
        "UPDATE posts SET status = 'failed', error_message = ?1 WHERE id = ?2",
        params![error_message, id],
    )?;
    Ok(())
}

pub fn count_posts_with_status(conn: &Connection, status: PostStatus) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn post_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
    Ok(count)
}

/// Posts created at or after the given instant (daily posting cap).
pub fn posts_created_since(conn: &Connection, since: DateTime<Utc>) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE created_at >= ?1",
        params![format_timestamp(since)],
        |row| row.get(0),
    )?;
    Ok(count)
}

// --- Settings ---

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Job log ---

pub fn log_activity(conn: &Connection, level: &str, component: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO job_log (timestamp, level, component, message) VALUES (?1, ?2, ?3, ?4)",
        params![format_timestamp(Utc::now()), level, component, message],
    )?;
    Ok(())
}

/// Most recent activity first.
pub fn recent_logs(conn: &Connection, limit: u32) -> Result<Vec<JobLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, level, component, message
         FROM job_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(JobLogEntry {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            level: row.get(2)?,
            component: row.get(3)?,
            message: row.get(4)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}
