use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use kindling::cluster::{ClusterConfig, ClusterEngine};
use kindling::compose::openai::OpenAiComposer;
use kindling::config::Config;
use kindling::db::sqlite::SqliteDatabase;
use kindling::db::traits::{Database, TopicStore};
use kindling::publish::linkedin::LinkedInClient;

/// Kindling: trending-topic clustering and LinkedIn post pipeline.
///
/// Harvests trending topics from Reddit and X, clusters and ranks them,
/// drafts LinkedIn posts with OpenAI, and publishes on a schedule.
#[derive(Parser)]
#[command(name = "kindling", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Fetch topics from all configured sources, then cluster and rank them
    Fetch,

    /// Generate a LinkedIn draft from the top ranked topics
    Generate {
        /// Build the draft from specific topic ids instead of the top ranked
        #[arg(long = "topic-ids", short = 't')]
        topic_ids: Vec<i64>,
    },

    /// Publish a queued draft to LinkedIn
    Publish {
        /// The draft id to publish (see `kindling logs`)
        post_id: i64,
    },

    /// Run the scheduler (fetch and post on their configured intervals)
    Run,

    /// Show system status (credentials, topic/post counts, schedule)
    Status,

    /// Show recent pipeline activity
    Logs {
        /// Number of entries to show (default: 10)
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Pause the scheduled jobs (manual commands still work)
    Pause,

    /// Resume the scheduled jobs
    Resume,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; credentials may come from the real environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kindling=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Kindling database...");
            let config = Config::load()?;
            let db = init_database(&config)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nKindling is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: cargo run -- fetch");
        }

        Commands::Fetch => {
            let config = Config::load()?;
            let db = open_database(&config)?;

            if !config.reddit_configured() && !config.x_configured() {
                println!(
                    "{} No source credentials configured — nothing will be fetched.",
                    "Warning:".yellow()
                );
                println!("  Set REDDIT_CLIENT_ID/SECRET or X_BEARER_TOKEN in your .env");
            }

            println!("Fetching topics from configured sources...");

            let store: Arc<dyn TopicStore> = db.clone();
            let engine = ClusterEngine::new(store, ClusterConfig::default());
            let report = kindling::jobs::run_fetch_job(&config, db.as_ref(), &engine).await?;

            println!("\n{}", "Fetch complete.".bold());
            println!(
                "  Reddit: {} topics, X: {} topics",
                report.stats.reddit_topics, report.stats.x_topics
            );
            println!(
                "  Stored: {} new, {} already seen",
                report.stats.inserted, report.stats.duplicates
            );

            kindling::output::terminal::display_shortlist(&report.shortlist);
        }

        Commands::Generate { topic_ids } => {
            let config = Config::load()?;
            config.require_openai()?;
            let db = open_database(&config)?;

            let ids = if topic_ids.is_empty() {
                let topics = db.top_ranked_topics(3).await?;
                if topics.is_empty() {
                    anyhow::bail!("No ranked topics yet. Run `kindling fetch` first.");
                }
                topics.iter().map(|t| t.id).collect()
            } else {
                topic_ids
            };

            println!("Generating draft from {} topics...", ids.len());

            let composer = OpenAiComposer::new(&config.openai_api_key, &config.openai_model)?;
            let draft = kindling::compose::generate_draft(
                db.as_ref(),
                &composer,
                &ids,
                config.min_post_length,
                config.max_post_length,
            )
            .await?;

            match db.get_post(draft.id).await? {
                Some(post) => kindling::output::terminal::display_draft(&post),
                None => println!("Draft {} saved.", draft.id),
            }
            println!(
                "{}",
                format!("To publish, run: cargo run -- publish {}", draft.id).dimmed()
            );
        }

        Commands::Publish { post_id } => {
            let config = Config::load()?;
            config.require_linkedin()?;
            let db = open_database(&config)?;

            let client =
                LinkedInClient::new(&config.linkedin_access_token, &config.linkedin_person_urn)?;

            println!("Verifying LinkedIn credentials...");
            if !client.verify_credentials().await? {
                anyhow::bail!(
                    "LinkedIn rejected the access token. Check LINKEDIN_ACCESS_TOKEN in your .env."
                );
            }

            println!("Publishing draft {}...", post_id);
            let outcome = kindling::publish::publish_draft(db.as_ref(), &client, post_id).await?;

            println!("\n{}", "Published.".green().bold());
            println!("  Post: {}", outcome.post_urn);
            println!("  Feed: {}", outcome.feed_url);
        }

        Commands::Run => {
            let config = Arc::new(Config::load()?);
            let db = open_database(&config)?;

            println!("Starting scheduler (Ctrl-C to stop)...");
            kindling::jobs::scheduler::run(config, db).await?;
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `kindling init` to set up the database.");
                return Ok(());
            }
            let db = open_database(&config)?;
            kindling::status::show(&config, db.as_ref()).await?;
        }

        Commands::Logs { limit } => {
            let config = Config::load()?;
            let db = open_database(&config)?;
            let entries = db.recent_logs(limit).await?;
            kindling::output::terminal::display_logs(&entries);
        }

        Commands::Pause => {
            let config = Config::load()?;
            let db = open_database(&config)?;
            db.set_setting("paused", "true").await?;
            db.log_activity("INFO", "scheduler", "Pipeline paused")
                .await?;
            println!("Scheduled jobs paused. Manual commands still work.");
            println!("{}", "Run `kindling resume` to re-enable.".dimmed());
        }

        Commands::Resume => {
            let config = Config::load()?;
            let db = open_database(&config)?;
            db.set_setting("paused", "false").await?;
            db.log_activity("INFO", "scheduler", "Pipeline resumed")
                .await?;
            println!("Scheduled jobs resumed.");
        }
    }

    Ok(())
}

/// Open an existing database, wrapped for shared async access.
fn open_database(config: &Config) -> Result<Arc<SqliteDatabase>> {
    let conn = kindling::db::open(&config.db_path)?;
    Ok(Arc::new(SqliteDatabase::new(conn)))
}

/// Create the database if needed and set up the schema.
fn init_database(config: &Config) -> Result<Arc<SqliteDatabase>> {
    let conn = kindling::db::initialize(&config.db_path)?;
    Ok(Arc::new(SqliteDatabase::new(conn)))
}
