// System status display — configured credentials, DB stats, schedule settings.

use anyhow::Result;

use crate::config::Config;
use crate::db::models::PostStatus;
use crate::db::traits::Database;
use crate::jobs::{is_paused, setting_i64};

/// Display system status to the terminal. Assumes the database exists;
/// the CLI handles the not-initialized case before opening it.
pub async fn show(config: &Config, db: &dyn Database) -> Result<()> {
    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    println!("\nCredentials:");
    println!("  Reddit:   {}", configured_label(config.reddit_configured()));
    println!("  X:        {}", configured_label(config.x_configured()));
    println!("  OpenAI:   {}", configured_label(config.openai_configured()));
    println!(
        "  LinkedIn: {}",
        configured_label(config.linkedin_configured())
    );

    let topics = db.topic_count().await?;
    let unprocessed = db.unprocessed_topic_count().await?;
    println!("\nTopics: {} total, {} awaiting clustering", topics, unprocessed);

    let queued = db.count_posts_with_status(PostStatus::Queued).await?;
    let posted = db.count_posts_with_status(PostStatus::Posted).await?;
    let failed = db.count_posts_with_status(PostStatus::Failed).await?;
    println!(
        "Posts: {} queued, {} posted, {} failed",
        queued, posted, failed
    );

    let fetch_interval = setting_i64(db, "fetch_interval", 43200).await;
    let post_interval = setting_i64(db, "post_interval", 3600).await;
    let cap = setting_i64(db, "max_posts_per_day", 5).await;
    println!("\nSchedule:");
    println!("  Fetch every: {}", format_interval(fetch_interval));
    println!("  Post every:  {}", format_interval(post_interval));
    println!("  Daily cap:   {} posts", cap);
    if is_paused(db).await {
        println!("  Paused: yes (run `kindling resume` to re-enable)");
    }

    let logs = db.recent_logs(5).await?;
    if logs.is_empty() {
        println!("\nRecent activity: none yet");
        println!("  Run `kindling fetch` to pull topics");
    } else {
        println!("\nRecent activity:");
        for entry in &logs {
            println!(
                "  {} [{}] {}: {}",
                entry.timestamp, entry.level, entry.component, entry.message
            );
        }
    }

    Ok(())
}

fn configured_label(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "not configured"
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_interval(seconds: i64) -> String {
    if seconds % 3600 == 0 {
        format!("{}h", seconds / 3600)
    } else if seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}s", seconds)
    }
}
