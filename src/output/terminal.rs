// Colored terminal output for shortlists, drafts, and activity logs.
//
// Everything the CLI prints beyond one-line confirmations is formatted
// here, so main.rs stays free of layout code.

use colored::Colorize;

use crate::cluster::ShortlistEntry;
use crate::db::models::{DraftPost, JobLogEntry, PostStatus};

/// Display the ranked shortlist in the terminal.
pub fn display_shortlist(entries: &[ShortlistEntry]) {
    if entries.is_empty() {
        println!("No topics shortlisted yet. Run `kindling fetch` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Topic Shortlist ({} topics) ===", entries.len()).bold()
    );
    println!();

    // Header
    println!(
        "  {:>4}  {:<52} {:>7}  {:>6}  {:<8}",
        "Rank".dimmed(),
        "Title".dimmed(),
        "Cluster".dimmed(),
        "Score".dimmed(),
        "Source".dimmed(),
    );
    println!("  {}", "-".repeat(84).dimmed());

    for (i, entry) in entries.iter().enumerate() {
        let title = super::truncate_chars(&entry.title, 48);
        println!(
            "  {:>4}. {:<52} {:>7}  {:>6.3}  {:<8}",
            i + 1,
            title,
            entry.cluster_id,
            entry.rank_score,
            colorize_source(&entry.source),
        );
    }

    println!();

    let clusters: std::collections::BTreeSet<i64> =
        entries.iter().map(|e| e.cluster_id).collect();
    println!(
        "  {} topics across {} clusters",
        entries.len(),
        clusters.len()
    );
}

/// Display a single draft with its sections and publication state.
pub fn display_draft(post: &DraftPost) {
    println!("\n{}", format!("=== Draft #{} ===", post.id).bold());

    println!("  Status: {}", colorize_status(post.status));
    println!("  Created: {}", post.created_at);
    if let Some(posted_at) = &post.posted_at {
        println!("  Posted: {}", posted_at);
    }
    if let Some(urn) = &post.linkedin_post_id {
        println!(
            "  Feed: https://www.linkedin.com/feed/update/{}",
            urn
        );
    }
    if let Some(error) = &post.error_message {
        println!("  Error: {}", error.red());
    }
    println!(
        "  Length: {} chars, built from {} topics",
        post.content.chars().count(),
        post.topic_ids.len()
    );

    println!("\n{}", "--- content ---".dimmed());
    println!("{}", post.content);
    println!("{}", "---------------".dimmed());
}

/// Display recent pipeline activity, newest first.
pub fn display_logs(entries: &[JobLogEntry]) {
    if entries.is_empty() {
        println!("No activity logged yet.");
        return;
    }

    for entry in entries {
        let level = colorize_level(&entry.level);
        println!(
            "  {}  {:<7} {:<10} {}",
            entry.timestamp.dimmed(),
            level,
            entry.component,
            entry.message
        );
    }
}

fn colorize_source(source: &str) -> colored::ColoredString {
    match source {
        "reddit" => source.bright_red(),
        "x" => source.cyan(),
        _ => source.normal(),
    }
}

fn colorize_status(status: PostStatus) -> colored::ColoredString {
    let s = status.as_str();
    match status {
        PostStatus::Queued => s.yellow(),
        PostStatus::Posted => s.green(),
        PostStatus::Failed => s.red().bold(),
    }
}

fn colorize_level(level: &str) -> colored::ColoredString {
    match level.to_uppercase().as_str() {
        "ERROR" => level.red().bold(),
        "WARNING" | "WARN" => level.yellow(),
        _ => level.normal(),
    }
}
