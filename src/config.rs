use std::env;

use anyhow::Result;

/// Subreddits harvested when KINDLING_SUBREDDITS is not set.
const DEFAULT_SUBREDDITS: &[&str] = &["androiddev", "android", "Kotlin", "JetpackCompose"];

/// X hashtags searched when KINDLING_HASHTAGS is not set.
const DEFAULT_HASHTAGS: &[&str] = &[
    "#AndroidDev",
    "#Kotlin",
    "#JetpackCompose",
    "#AndroidDevelopment",
    "#MobileApp",
];

/// Process-level configuration, read once at startup.
///
/// Secrets and identity come from env vars (dotenvy loads .env first).
/// Runtime-tunable knobs (intervals, pause flag, posting caps) live in
/// the settings table instead — see `db::queries`.
pub struct Config {
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    /// Reddit requires a descriptive User-Agent on every request.
    pub reddit_user_agent: String,
    pub x_bearer_token: String,
    pub openai_api_key: String,
    /// Chat model used for post generation (OPENAI_MODEL overrides).
    pub openai_model: String,
    pub linkedin_access_token: String,
    /// The member URN posts are published under (urn:li:person:...).
    pub linkedin_person_urn: String,
    pub db_path: String,
    pub subreddits: Vec<String>,
    pub x_hashtags: Vec<String>,
    /// Accepted length range for a generated post body, in characters.
    pub min_post_length: usize,
    pub max_post_length: usize,
}

impl Config {
    /// Read the environment. Everything has a default except the API
    /// credentials — commands that need those call the matching
    /// `require_*` before doing work.
    pub fn load() -> Result<Self> {
        Ok(Self {
            reddit_client_id: env::var("REDDIT_CLIENT_ID").unwrap_or_default(),
            reddit_client_secret: env::var("REDDIT_CLIENT_SECRET").unwrap_or_default(),
            reddit_user_agent: env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| "kindling/0.1".to_string()),
            x_bearer_token: env::var("X_BEARER_TOKEN").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),
            linkedin_access_token: env::var("LINKEDIN_ACCESS_TOKEN").unwrap_or_default(),
            linkedin_person_urn: env::var("LINKEDIN_PERSON_URN").unwrap_or_default(),
            db_path: env::var("KINDLING_DB_PATH").unwrap_or_else(|_| "./kindling.db".to_string()),
            subreddits: list_var("KINDLING_SUBREDDITS", DEFAULT_SUBREDDITS),
            x_hashtags: list_var("KINDLING_HASHTAGS", DEFAULT_HASHTAGS),
            min_post_length: usize_var("MIN_POST_LENGTH", 900),
            max_post_length: usize_var("MAX_POST_LENGTH", 1500),
        })
    }

    /// Check that the OpenAI API key is configured.
    /// Call this before generating a post.
    pub fn require_openai(&self) -> Result<()> {
        if self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that LinkedIn publishing credentials are configured.
    /// Call this before publishing a draft.
    pub fn require_linkedin(&self) -> Result<()> {
        if !self.linkedin_configured() {
            anyhow::bail!(
                "LINKEDIN_ACCESS_TOKEN / LINKEDIN_PERSON_URN not set. Add them to your .env file.\n\
                 Posts will be drafted but cannot be published without them."
            );
        }
        Ok(())
    }

    pub fn reddit_configured(&self) -> bool {
        !self.reddit_client_id.is_empty() && !self.reddit_client_secret.is_empty()
    }

    pub fn x_configured(&self) -> bool {
        !self.x_bearer_token.is_empty()
    }

    pub fn openai_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    pub fn linkedin_configured(&self) -> bool {
        !self.linkedin_access_token.is_empty() && !self.linkedin_person_urn.is_empty()
    }
}

/// Read a comma-separated list env var, falling back to built-in defaults.
fn list_var(name: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn usize_var(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
