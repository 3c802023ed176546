// Reddit source client.
//
// Authenticates with the OAuth client-credentials flow (script apps), then
// pulls each configured subreddit's hot listing plus its daily top listing.
// Submissions are mapped into NewTopic records; sticky posts and posts
// below the minimum score are dropped at this stage.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::db::models::NewTopic;
use crate::sources::rate_limit::{with_retry, RateLimiter};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Posts pulled per subreddit from the hot listing.
const HOT_LIMIT: u32 = 10;
/// Posts pulled per subreddit from the daily top listing.
const TOP_LIMIT: u32 = 5;
/// Self-text is cut to this many characters before storage.
const MAX_CONTENT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Submission,
}

/// The subset of a Reddit submission the pipeline cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    author: Option<String>,
    score: i64,
    num_comments: i64,
    #[serde(default)]
    stickied: bool,
}

/// Authenticated client for the Reddit data API.
pub struct RedditClient {
    client: reqwest::Client,
    access_token: String,
}

impl RedditClient {
    /// Exchange app credentials for a bearer token and return a ready client.
    pub async fn connect(client_id: &str, client_secret: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .post(TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Reddit token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit token endpoint returned {}: {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse Reddit token response")?;

        Ok(Self {
            client,
            access_token: token.access_token,
        })
    }

    async fn listing(&self, path: &str) -> Result<Vec<Submission>> {
        let url = format!("{API_BASE}{path}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Reddit API request failed: {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit API returned {}: {}", status, body);
        }

        let listing: Listing = response
            .json()
            .await
            .context("Failed to parse Reddit listing")?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Fetch one subreddit's hot and daily-top listings and map them to
    /// topics. Overlap between the two listings is fine; inserts dedupe on
    /// source_id downstream.
    pub async fn fetch_subreddit(
        &self,
        limiter: &RateLimiter,
        subreddit: &str,
        min_score: f64,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<NewTopic>> {
        let hot_path = format!("/r/{subreddit}/hot?limit={HOT_LIMIT}&raw_json=1");
        let hot = with_retry(limiter, || self.listing(&hot_path)).await?;

        let top_path = format!("/r/{subreddit}/top?t=day&limit={TOP_LIMIT}&raw_json=1");
        let top = with_retry(limiter, || self.listing(&top_path)).await?;

        let topics: Vec<NewTopic> = hot
            .into_iter()
            .chain(top)
            .filter_map(|s| map_submission(s, subreddit, min_score, fetched_at))
            .collect();

        debug!(
            subreddit = subreddit,
            count = topics.len(),
            "Mapped subreddit listings"
        );

        Ok(topics)
    }
}

/// Convert one submission into a topic, or drop it.
///
/// Sticky posts are moderator announcements, not trends. The minimum score
/// keeps low-signal posts out of the clustering batch entirely.
fn map_submission(
    submission: Submission,
    subreddit: &str,
    min_score: f64,
    fetched_at: DateTime<Utc>,
) -> Option<NewTopic> {
    if submission.stickied || (submission.score as f64) < min_score {
        return None;
    }

    let content = if submission.selftext.is_empty() {
        None
    } else {
        Some(submission.selftext.chars().take(MAX_CONTENT_CHARS).collect())
    };

    Some(NewTopic {
        source: "reddit".to_string(),
        source_id: format!("reddit_{}", submission.id),
        title: submission.title,
        content,
        url: format!("https://reddit.com{}", submission.permalink),
        author: Some(
            submission
                .author
                .unwrap_or_else(|| "deleted".to_string()),
        ),
        score: submission.score as f64,
        engagement: submission.num_comments,
        hashtags: vec![format!("#{subreddit}")],
        fetched_at,
    })
}
