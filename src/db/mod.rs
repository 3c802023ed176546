// Database layer — SQLite storage for topics, drafted posts, job activity,
// and runtime settings.
//
// rusqlite's "bundled" feature compiles SQLite in, so deployment is a
// single binary plus the database file, which lives wherever
// KINDLING_DB_PATH points (defaults to ./kindling.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Create the database file (with any missing parent directories) and set
/// up the schema. Backs `kindling init`; safe to rerun on an existing file.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = open_with_wal(db_path)?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Open an existing database; fails with a hint if `init` hasn't run yet.
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!(
            "Database not found at {}. Run `kindling init` first.",
            db_path
        );
    }
    open_with_wal(db_path)
}

// WAL keeps reads (status, logs) from blocking behind the scheduler's writes.
fn open_with_wal(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}
