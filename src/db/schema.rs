// Database schema — table creation and seed data.
//
// A `schema_version` table records which schema revisions have been applied.
// Table creation is idempotent and runs on every startup.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Settings rows seeded on first init. Values are strings; callers parse.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("fetch_interval", "43200"),
    ("post_interval", "3600"),
    ("paused", "false"),
    ("max_posts_per_day", "5"),
    ("min_topic_score", "10"),
];

/// Create any missing tables and seed default settings. Runs on every
/// `init`; existing tables and edited settings are left alone.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future revisions
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Harvested trending topics, one row per source item
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,              -- 'reddit' or 'x'
            source_id TEXT NOT NULL UNIQUE,    -- dedupe key, e.g. 'reddit_abc123'
            title TEXT NOT NULL,
            content TEXT,
            url TEXT NOT NULL,
            author TEXT,
            score REAL NOT NULL DEFAULT 0,     -- platform-native popularity
            engagement INTEGER NOT NULL DEFAULT 0,  -- comments / replies+quotes
            hashtags TEXT,                     -- JSON array of strings
            fetched_at TEXT NOT NULL,          -- RFC3339 UTC, recency reference
            cluster_id INTEGER,                -- assigned per clustering run
            rank_score REAL,                   -- composite quality score
            processed INTEGER NOT NULL DEFAULT 0   -- 1 once clustered, never reset
        );

        -- Generated LinkedIn drafts and their publication state
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic_ids TEXT NOT NULL,           -- JSON array of topic row ids
            content TEXT NOT NULL,             -- full assembled post body
            hook TEXT,
            insight TEXT,
            takeaway TEXT,
            cta TEXT,
            sources TEXT,                      -- JSON array of source URLs
            created_at TEXT NOT NULL,
            posted_at TEXT,
            status TEXT NOT NULL DEFAULT 'queued',  -- queued / posted / failed
            linkedin_post_id TEXT,
            error_message TEXT
        );

        -- Pipeline activity visible through `kindling logs`
        CREATE TABLE IF NOT EXISTS job_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL DEFAULT (datetime('now')),
            level TEXT NOT NULL,               -- info / warning / error
            component TEXT NOT NULL,           -- fetcher / cluster / composer / publisher
            message TEXT NOT NULL
        );

        -- Runtime-tunable settings (intervals, pause flag, caps)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for the eligibility query (unprocessed within the window)
        CREATE INDEX IF NOT EXISTS idx_topics_eligible
            ON topics(processed, fetched_at);

        -- Index for ranked topic lookups after clustering
        CREATE INDEX IF NOT EXISTS idx_topics_rank
            ON topics(rank_score);

        -- Index for post status counts and queued lookups
        CREATE INDEX IF NOT EXISTS idx_posts_status
            ON posts(status);
        ",
    )
    .context("Failed to create database tables")?;

    // Stamp the initial schema revision once
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Seed default settings without clobbering user edits
    for (key, value) in DEFAULT_SETTINGS {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
    }

    Ok(())
}

/// Number of user tables, shown by `kindling init` as a sanity check.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let count = table_count(&conn).unwrap();
        // schema_version, topics, posts, job_log, settings = 5 tables
        assert_eq!(count, 5i64);
    }

    #[test]
    fn test_default_settings_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let interval: String = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'fetch_interval'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(interval, "43200");

        let paused: String = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'paused'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(paused, "false");
    }

    #[test]
    fn test_reinit_keeps_edited_settings() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        conn.execute(
            "UPDATE settings SET value = '7200' WHERE key = 'fetch_interval'",
            [],
        )
        .unwrap();

        // A second init must not reset the user's edit
        create_tables(&conn).unwrap();
        let interval: String = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'fetch_interval'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(interval, "7200");
    }

    #[test]
    fn test_source_id_unique() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        conn.execute(
            "INSERT INTO topics (source, source_id, title, url, fetched_at)
             VALUES ('reddit', 'reddit_abc', 'First', 'https://reddit.com/a', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO topics (source, source_id, title, url, fetched_at)
             VALUES ('reddit', 'reddit_abc', 'Second', 'https://reddit.com/b', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(dup.is_err());
    }
}
