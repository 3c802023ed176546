// X (Twitter) source client.
//
// Runs a recent-search query per configured hashtag, excluding retweets and
// non-English posts. Tweet engagement maps onto the topic schema as
// score = likes + 2 * retweets and engagement = replies + quotes, so a
// widely-shared tweet outweighs a merely-liked one.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::db::models::NewTopic;
use crate::sources::rate_limit::{with_retry, RateLimiter};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Tweets requested per hashtag query.
const MAX_RESULTS: u32 = 20;
/// Titles are cut to this many characters; the full text goes in content.
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<XUser>,
}

#[derive(Debug, Deserialize)]
struct XUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    #[serde(default)]
    public_metrics: PublicMetrics,
    #[serde(default)]
    entities: Entities,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    reply_count: i64,
    #[serde(default)]
    quote_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Entities {
    #[serde(default)]
    hashtags: Vec<HashtagEntity>,
}

#[derive(Debug, Deserialize)]
struct HashtagEntity {
    tag: String,
}

/// Client for the X v2 recent-search API.
pub struct XClient {
    client: reqwest::Client,
    bearer_token: String,
}

impl XClient {
    pub fn new(bearer_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("kindling/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            bearer_token: bearer_token.to_string(),
        })
    }

    async fn search(&self, hashtag: &str) -> Result<SearchResponse> {
        let query = format!("{hashtag} -is:retweet lang:en");

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", &MAX_RESULTS.to_string()),
                ("tweet.fields", "created_at,author_id,public_metrics,entities"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ])
            .send()
            .await
            .with_context(|| format!("X search request failed: {hashtag}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("X API returned {}: {}", status, body);
        }

        response
            .json::<SearchResponse>()
            .await
            .context("Failed to parse X search response")
    }

    /// Search one hashtag and map the results to topics.
    pub async fn fetch_hashtag(
        &self,
        limiter: &RateLimiter,
        hashtag: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<NewTopic>> {
        let response = with_retry(limiter, || self.search(hashtag)).await?;
        let topics = map_search_response(response, hashtag, fetched_at);

        debug!(hashtag = hashtag, count = topics.len(), "Mapped hashtag search");
        Ok(topics)
    }
}

fn map_search_response(
    response: SearchResponse,
    hashtag: &str,
    fetched_at: DateTime<Utc>,
) -> Vec<NewTopic> {
    let users: HashMap<String, String> = response
        .includes
        .users
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    response
        .data
        .into_iter()
        .map(|tweet| map_tweet(tweet, &users, hashtag, fetched_at))
        .collect()
}

fn map_tweet(
    tweet: Tweet,
    users: &HashMap<String, String>,
    hashtag: &str,
    fetched_at: DateTime<Utc>,
) -> NewTopic {
    let username = tweet
        .author_id
        .as_ref()
        .and_then(|id| users.get(id))
        .cloned();

    let metrics = &tweet.public_metrics;
    let mut hashtags = vec![hashtag.to_string()];
    hashtags.extend(tweet.entities.hashtags.iter().map(|h| format!("#{}", h.tag)));

    NewTopic {
        source: "x".to_string(),
        source_id: format!("x_{}", tweet.id),
        title: tweet.text.chars().take(MAX_TITLE_CHARS).collect(),
        content: Some(tweet.text.clone()),
        url: format!(
            "https://twitter.com/{}/status/{}",
            username.as_deref().unwrap_or("user"),
            tweet.id
        ),
        author: Some(username.unwrap_or_else(|| "unknown".to_string())),
        score: (metrics.like_count + metrics.retweet_count * 2) as f64,
        engagement: metrics.reply_count + metrics.quote_count,
        hashtags,
        fetched_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    const RESPONSE: &str = r#"{
        "data": [
            {
                "id": "1801",
                "text": "Jetpack Compose 1.7 brings shared element transitions #JetpackCompose #AndroidDev",
                "author_id": "42",
                "public_metrics": {
                    "like_count": 30,
                    "retweet_count": 10,
                    "reply_count": 4,
                    "quote_count": 2
                },
                "entities": {
                    "hashtags": [{"tag": "JetpackCompose"}, {"tag": "AndroidDev"}]
                }
            }
        ],
        "includes": {
            "users": [{"id": "42", "username": "composefan"}]
        }
    }"#;

    #[test]
    fn test_maps_search_response() {
        let response: SearchResponse = serde_json::from_str(RESPONSE).unwrap();
        let topics = map_search_response(response, "#AndroidDev", now());

        assert_eq!(topics.len(), 1);
        let topic = &topics[0];
        assert_eq!(topic.source, "x");
        assert_eq!(topic.source_id, "x_1801");
        assert_eq!(topic.url, "https://twitter.com/composefan/status/1801");
        assert_eq!(topic.author.as_deref(), Some("composefan"));
        // 30 likes + 2 * 10 retweets
        assert_eq!(topic.score, 50.0);
        // 4 replies + 2 quotes
        assert_eq!(topic.engagement, 6);
        assert_eq!(
            topic.hashtags,
            vec!["#AndroidDev", "#JetpackCompose", "#AndroidDev"]
        );
        assert_eq!(topic.fetched_at, now());
    }

    #[test]
    fn test_empty_response_maps_to_no_topics() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(map_search_response(response, "#Kotlin", now()).is_empty());
    }

    #[test]
    fn test_unknown_author_falls_back() {
        let json = r#"{
            "data": [{"id": "9", "text": "hello"}]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let topics = map_search_response(response, "#Kotlin", now());

        assert_eq!(topics[0].url, "https://twitter.com/user/status/9");
        assert_eq!(topics[0].author.as_deref(), Some("unknown"));
        assert_eq!(topics[0].score, 0.0);
        assert_eq!(topics[0].engagement, 0);
    }

    #[test]
    fn test_long_text_title_truncated() {
        let text = "k".repeat(300);
        let json = format!(r#"{{"data": [{{"id": "7", "text": "{text}"}}]}}"#);
        let response: SearchResponse = serde_json::from_str(&json).unwrap();
        let topics = map_search_response(response, "#Kotlin", now());

        assert_eq!(topics[0].title.chars().count(), 200);
        // content keeps the full text
        assert_eq!(topics[0].content.as_deref().unwrap().len(), 300);
    }
}
