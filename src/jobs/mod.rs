// Background jobs: the fetch pass and the post pass.
//
// Each job is a plain async function, so the CLI can run one manually and
// the scheduler can run them on an interval. Outcomes are recorded in the
// job_log table. Per-source failures stay contained inside the fetch pass;
// a job-level error means something systemic (storage, schema) went wrong.

pub mod scheduler;

use anyhow::Result;
use chrono::{NaiveTime, Utc};
use tracing::{info, warn};

use crate::cluster::{ClusterEngine, ShortlistEntry};
use crate::compose::{self, openai::OpenAiComposer};
use crate::config::Config;
use crate::db::traits::Database;
use crate::publish::{self, linkedin::LinkedInClient};
use crate::sources::{self, FetchStats};

/// Topics blended into one generated post.
const TOPICS_PER_POST: u32 = 3;

/// Result of one fetch job.
#[derive(Debug)]
pub struct FetchReport {
    pub stats: FetchStats,
    pub shortlist: Vec<ShortlistEntry>,
}

/// Result of one post job.
#[derive(Debug)]
pub enum PostOutcome {
    DailyCapReached { cap: i64 },
    NoTopics,
    ComposerUnavailable,
    Drafted { post_id: i64 },
    Published { post_id: i64, feed_url: String },
    PublishFailed { post_id: i64, error: String },
}

/// Fetch all sources, then cluster and rank whatever became eligible.
pub async fn run_fetch_job(
    config: &Config,
    db: &dyn Database,
    engine: &ClusterEngine,
) -> Result<FetchReport> {
    db.log_activity("INFO", "fetcher", "Starting topic fetch job")
        .await?;

    let stats = sources::run_fetch(config, db).await?;
    let shortlist = engine.run(Utc::now()).await?;

    db.log_activity(
        "INFO",
        "fetcher",
        &format!(
            "Fetch job completed. Reddit: {}, X: {}, inserted: {}, shortlist: {}",
            stats.reddit_topics,
            stats.x_topics,
            stats.inserted,
            shortlist.len()
        ),
    )
    .await?;

    Ok(FetchReport { stats, shortlist })
}

/// Generate a post from the top ranked topics and publish it if LinkedIn
/// credentials are present.
///
/// The daily cap counts drafts created since UTC midnight, published or
/// not, so a failing publisher cannot churn out unlimited drafts.
pub async fn run_post_job(config: &Config, db: &dyn Database) -> Result<PostOutcome> {
    let cap = setting_i64(db, "max_posts_per_day", 5).await;
    let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let today = db.posts_created_since(midnight).await?;
    if cap > 0 && today >= cap {
        info!(cap = cap, "Daily post cap reached, skipping post job");
        return Ok(PostOutcome::DailyCapReached { cap });
    }

    let topics = db.top_ranked_topics(TOPICS_PER_POST).await?;
    if topics.is_empty() {
        info!("No ranked topics available for post generation");
        return Ok(PostOutcome::NoTopics);
    }

    if !config.openai_configured() {
        warn!("OPENAI_API_KEY not configured, cannot generate a draft");
        return Ok(PostOutcome::ComposerUnavailable);
    }

    db.log_activity("INFO", "poster", "Starting post generation job")
        .await?;

    let composer = OpenAiComposer::new(&config.openai_api_key, &config.openai_model)?;
    let topic_ids: Vec<i64> = topics.iter().map(|t| t.id).collect();
    let draft = compose::generate_draft(
        db,
        &composer,
        &topic_ids,
        config.min_post_length,
        config.max_post_length,
    )
    .await?;

    if !config.linkedin_configured() {
        db.log_activity(
            "INFO",
            "poster",
            &format!(
                "Draft {} queued; LinkedIn credentials not configured",
                draft.id
            ),
        )
        .await?;
        return Ok(PostOutcome::Drafted { post_id: draft.id });
    }

    let client = LinkedInClient::new(&config.linkedin_access_token, &config.linkedin_person_urn)?;
    match publish::publish_draft(db, &client, draft.id).await {
        Ok(outcome) => {
            db.log_activity(
                "INFO",
                "poster",
                &format!("Published post {}: {}", draft.id, outcome.post_urn),
            )
            .await?;
            Ok(PostOutcome::Published {
                post_id: draft.id,
                feed_url: outcome.feed_url,
            })
        }
        Err(e) => {
            let error = format!("{e:#}");
            db.log_activity(
                "ERROR",
                "poster",
                &format!("Failed to publish post {}: {}", draft.id, error),
            )
            .await?;
            Ok(PostOutcome::PublishFailed {
                post_id: draft.id,
                error,
            })
        }
    }
}

/// Read an integer setting, falling back on missing or malformed values.
pub(crate) async fn setting_i64(db: &dyn Database, key: &str, default: i64) -> i64 {
    match db.get_setting(key).await {
        Ok(Some(value)) => value.parse().unwrap_or(default),
        _ => default,
    }
}

pub(crate) async fn is_paused(db: &dyn Database) -> bool {
    matches!(db.get_setting("paused").await, Ok(Some(v)) if v.to_lowercase() == "true")
}
