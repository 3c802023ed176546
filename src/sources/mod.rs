// Source fetch orchestration.
//
// Pulls trending content from every configured source, then inserts the
// union into the topics table. Inserts dedupe on source_id, so refetching
// an unchanged listing is a no-op. A failing source is logged and the
// others still run; only storage errors abort the pass.

pub mod rate_limit;
pub mod reddit;
pub mod x;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::models::NewTopic;
use crate::db::traits::Database;
use crate::sources::rate_limit::{is_rate_limit_error, RateLimiter};
use crate::sources::reddit::RedditClient;
use crate::sources::x::XClient;

/// Subreddits fetched concurrently. The shared limiter keeps the overall
/// request rate legal regardless of this value.
const REDDIT_CONCURRENCY: usize = 3;

/// Outcome counts for one fetch pass.
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    pub reddit_topics: usize,
    pub x_topics: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Fetch all configured sources and store the results.
pub async fn run_fetch(config: &Config, db: &dyn Database) -> Result<FetchStats> {
    let fetched_at = Utc::now();
    let min_score = min_topic_score(db).await;

    let mut stats = FetchStats::default();
    let mut topics: Vec<NewTopic> = Vec::new();

    if config.reddit_configured() {
        match RedditClient::connect(
            &config.reddit_client_id,
            &config.reddit_client_secret,
            &config.reddit_user_agent,
        )
        .await
        {
            Ok(client) => {
                let found = fetch_reddit(&client, &config.subreddits, min_score, fetched_at).await;
                stats.reddit_topics = found.len();
                topics.extend(found);
            }
            Err(e) => warn!(error = %e, "Reddit authentication failed, skipping source"),
        }
    } else {
        info!("Reddit credentials not configured, skipping source");
    }

    if config.x_configured() {
        match XClient::new(&config.x_bearer_token) {
            Ok(client) => {
                let found = fetch_x(&client, &config.x_hashtags, fetched_at).await;
                stats.x_topics = found.len();
                topics.extend(found);
            }
            Err(e) => warn!(error = %e, "Failed to build X client, skipping source"),
        }
    } else {
        info!("X bearer token not configured, skipping source");
    }

    for topic in &topics {
        if db.insert_topic(topic).await? {
            stats.inserted += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    info!(
        reddit = stats.reddit_topics,
        x = stats.x_topics,
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        "Fetch pass complete"
    );

    Ok(stats)
}

/// Fetch all subreddits a few at a time. Failed subreddits are skipped.
async fn fetch_reddit(
    client: &RedditClient,
    subreddits: &[String],
    min_score: f64,
    fetched_at: chrono::DateTime<Utc>,
) -> Vec<NewTopic> {
    let limiter = RateLimiter::reddit();
    let limiter = &limiter;

    // Materialized into a Vec so the spawned future's Send bound checks
    // with a concrete lifetime (rust-lang/rust#102211).
    let fetches: Vec<_> = subreddits
        .iter()
        .map(|subreddit| async move {
            let result = client
                .fetch_subreddit(limiter, subreddit, min_score, fetched_at)
                .await;
            (subreddit.clone(), result)
        })
        .collect();

    let results: Vec<(String, Result<Vec<NewTopic>>)> = stream::iter(fetches)
        .buffer_unordered(REDDIT_CONCURRENCY)
        .collect()
        .await;

    let mut topics = Vec::new();
    for (subreddit, result) in results {
        match result {
            Ok(found) => topics.extend(found),
            Err(e) => warn!(subreddit = subreddit, error = %e, "Subreddit fetch failed, skipping"),
        }
    }
    topics
}

/// Search hashtags one at a time. A confirmed rate-limit failure stops the
/// remaining hashtags; the 15-minute search window is already spent.
async fn fetch_x(
    client: &XClient,
    hashtags: &[String],
    fetched_at: chrono::DateTime<Utc>,
) -> Vec<NewTopic> {
    let limiter = RateLimiter::x();

    let mut topics = Vec::new();
    for hashtag in hashtags {
        match client.fetch_hashtag(&limiter, hashtag, fetched_at).await {
            Ok(found) => topics.extend(found),
            Err(e) if is_rate_limit_error(&e) => {
                warn!(hashtag = hashtag, "X rate limit exhausted, stopping hashtag search");
                break;
            }
            Err(e) => warn!(hashtag = hashtag, error = %e, "Hashtag search failed, skipping"),
        }
    }
    topics
}

async fn min_topic_score(db: &dyn Database) -> f64 {
    match db.get_setting("min_topic_score").await {
        Ok(Some(value)) => value.parse().unwrap_or(10.0),
        _ => 10.0,
    }
}
