// Interval scheduling for the two background jobs.
//
// Two independent tokio loops, one per job. Each cycle re-reads its
// interval and the pause flag from the settings table, so `kindling pause`
// or a settings edit takes effect at the next tick without a restart.
// Loops sleep before the first pass; `kindling fetch` covers the case
// where topics are wanted right away.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::cluster::{ClusterConfig, ClusterEngine};
use crate::config::Config;
use crate::db::sqlite::SqliteDatabase;
use crate::db::traits::{Database, TopicStore};
use crate::jobs::{self, is_paused, setting_i64};

/// Floor for both intervals; a zero or negative setting would spin.
const MIN_INTERVAL_SECS: i64 = 60;

/// Run both job loops until Ctrl-C.
pub async fn run(config: Arc<Config>, db: Arc<SqliteDatabase>) -> Result<()> {
    let store: Arc<dyn TopicStore> = db.clone();
    let engine = Arc::new(ClusterEngine::new(store, ClusterConfig::default()));

    db.log_activity("INFO", "scheduler", "Scheduler started")
        .await?;
    info!("Scheduler running, press Ctrl-C to stop");

    let fetch_task = {
        let config = config.clone();
        let db = db.clone();
        let engine = engine.clone();
        tokio::spawn(async move {
            loop {
                let interval = setting_i64(db.as_ref(), "fetch_interval", 43200)
                    .await
                    .max(MIN_INTERVAL_SECS);
                info!(seconds = interval, "Next fetch pass scheduled");
                tokio::time::sleep(Duration::from_secs(interval as u64)).await;

                if is_paused(db.as_ref()).await {
                    info!("Paused, skipping fetch job");
                    continue;
                }

                match jobs::run_fetch_job(&config, db.as_ref(), &engine).await {
                    Ok(report) => info!(
                        inserted = report.stats.inserted,
                        shortlist = report.shortlist.len(),
                        "Fetch job finished"
                    ),
                    Err(e) => {
                        error!(error = %e, "Fetch job failed");
                        let _ = db
                            .log_activity("ERROR", "fetcher", &format!("Fetch job failed: {e:#}"))
                            .await;
                    }
                }
            }
        })
    };

    let post_task = {
        let config = config.clone();
        let db = db.clone();
        tokio::spawn(async move {
            loop {
                let interval = setting_i64(db.as_ref(), "post_interval", 3600)
                    .await
                    .max(MIN_INTERVAL_SECS);
                info!(seconds = interval, "Next post pass scheduled");
                tokio::time::sleep(Duration::from_secs(interval as u64)).await;

                if is_paused(db.as_ref()).await {
                    info!("Paused, skipping post job");
                    continue;
                }

                match jobs::run_post_job(&config, db.as_ref()).await {
                    Ok(outcome) => info!(outcome = ?outcome, "Post job finished"),
                    Err(e) => {
                        error!(error = %e, "Post job failed");
                        let _ = db
                            .log_activity("ERROR", "poster", &format!("Post job failed: {e:#}"))
                            .await;
                    }
                }
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    fetch_task.abort();
    post_task.abort();
    db.log_activity("INFO", "scheduler", "Scheduler stopped")
        .await?;

    Ok(())
}
