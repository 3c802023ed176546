// OpenAI-backed composer.
//
// One chat-completion call per draft. The model is asked for strict JSON
// with the four post sections; when it answers in prose anyway, a
// line-based fallback carves the text into sections rather than wasting
// the tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compose::{Composer, PostSections};
use crate::db::models::Topic;

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Topic bodies are cut to this many characters in the prompt context.
const CONTEXT_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "\
You are an experienced Android developer writing LinkedIn posts about \
development trends.

Rules:
1. Never copy text verbatim from the source material
2. Write original analysis, not summaries
3. Keep a professional tone aimed at working Android developers

Produce a post with these sections:
- hook: attention-grabbing opening (1-2 lines)
- insight: the main technical insight or trend analysis (3-4 lines)
- takeaway: practical advice or key learning (2-3 lines)
- cta: one line inviting discussion

Target length: 900-1500 characters total.
Include relevant hashtags such as #AndroidDev #Kotlin #MobileDev.

Respond with JSON only:
{\"hook\": \"...\", \"insight\": \"...\", \"takeaway\": \"...\", \"cta\": \"...\"}";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct OpenAiComposer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiComposer {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn chat(&self, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        let response = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("OpenAI request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API returned {}: {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no choices"))
    }
}

#[async_trait]
impl Composer for OpenAiComposer {
    async fn compose(&self, topics: &[Topic]) -> Result<PostSections> {
        let prompt = build_context(topics);
        let raw = self.chat(&prompt).await?;
        debug!(chars = raw.chars().count(), "Model response received");
        Ok(parse_sections(&raw))
    }
}

/// Render the topics into the user prompt.
fn build_context(topics: &[Topic]) -> String {
    let mut context =
        String::from("Create a LinkedIn post based on these trending Android development topics:\n\n");

    for (i, topic) in topics.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", i + 1, topic.title));
        if let Some(body) = &topic.content {
            let snippet: String = body.chars().take(CONTEXT_CHARS).collect();
            context.push_str(&format!("   Context: {snippet}...\n"));
        }
        context.push_str(&format!(
            "   Engagement: {} points, {} comments\n   Source: {}\n\n",
            topic.score, topic.engagement, topic.source
        ));
    }

    context.push_str("\nCreate an original post that synthesizes these trends. DO NOT copy text directly.");
    context
}

/// Parse the model output into sections.
///
/// Strict JSON first, with markdown code fences stripped. If that fails,
/// fall back to splitting the text by lines: first line is the hook, the
/// last line the cta, and the middle lines fill insight and takeaway.
fn parse_sections(raw: &str) -> PostSections {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(sections) = serde_json::from_str::<PostSections>(stripped) {
        return sections;
    }

    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    PostSections {
        hook: lines.first().copied().unwrap_or_default().to_string(),
        insight: join_lines(&lines, 1, 4),
        takeaway: join_lines(&lines, 4, 6),
        cta: lines.last().copied().unwrap_or_default().to_string(),
    }
}

fn join_lines(lines: &[&str], start: usize, end: usize) -> String {
    if lines.len() <= start {
        return String::new();
    }
    lines[start..lines.len().min(end)].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn topic(title: &str, content: Option<&str>) -> Topic {
        Topic {
            id: 1,
            source: "reddit".to_string(),
            source_id: "reddit_t".to_string(),
            title: title.to_string(),
            content: content.map(|s| s.to_string()),
            url: "https://reddit.com/t".to_string(),
            author: Some("author".to_string()),
            score: 150.0,
            engagement: 25,
            hashtags: vec![],
            fetched_at: Utc::now(),
            cluster_id: None,
            rank_score: None,
            processed: false,
        }
    }

    #[test]
    fn test_parse_sections_strict_json() {
        let raw = r#"{"hook": "H", "insight": "I", "takeaway": "T", "cta": "C"}"#;
        let sections = parse_sections(raw);
        assert_eq!(sections.hook, "H");
        assert_eq!(sections.insight, "I");
        assert_eq!(sections.takeaway, "T");
        assert_eq!(sections.cta, "C");
    }

    #[test]
    fn test_parse_sections_fenced_json() {
        let raw = "```json\n{\"hook\": \"H\", \"insight\": \"I\", \"takeaway\": \"T\", \"cta\": \"C\"}\n```";
        let sections = parse_sections(raw);
        assert_eq!(sections.hook, "H");
        assert_eq!(sections.cta, "C");
    }

    #[test]
    fn test_parse_sections_partial_json_defaults_empty() {
        let sections = parse_sections(r#"{"hook": "only a hook"}"#);
        assert_eq!(sections.hook, "only a hook");
        assert_eq!(sections.insight, "");
        assert_eq!(sections.cta, "");
    }

    #[test]
    fn test_parse_sections_prose_fallback() {
        let raw = "Opening line\nInsight a\nInsight b\nInsight c\nTakeaway a\nTakeaway b\nClosing question?";
        let sections = parse_sections(raw);
        assert_eq!(sections.hook, "Opening line");
        assert_eq!(sections.insight, "Insight a\nInsight b\nInsight c");
        assert_eq!(sections.takeaway, "Takeaway a\nTakeaway b");
        assert_eq!(sections.cta, "Closing question?");
    }

    #[test]
    fn test_parse_sections_short_prose() {
        let sections = parse_sections("Just one line");
        assert_eq!(sections.hook, "Just one line");
        assert_eq!(sections.insight, "");
        assert_eq!(sections.takeaway, "");
        // a single line serves as both hook and cta
        assert_eq!(sections.cta, "Just one line");
    }

    #[test]
    fn test_build_context_layout() {
        let topics = vec![
            topic("Compose 1.7 released", Some("Shared element transitions land")),
            topic("KSP2 is stable", None),
        ];
        let context = build_context(&topics);

        assert!(context.contains("1. Compose 1.7 released"));
        assert!(context.contains("Context: Shared element transitions land..."));
        assert!(context.contains("Engagement: 150 points, 25 comments"));
        assert!(context.contains("2. KSP2 is stable"));
        assert!(context.contains("DO NOT copy text directly"));
        // topic without a body gets no context line
        assert_eq!(context.matches("Context:").count(), 1);
    }
}
