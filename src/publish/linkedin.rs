// LinkedIn UGC posts client.
//
// Publishes text shares through the v2 ugcPosts endpoint. The payload
// shape and the X-Restli-Protocol-Version header are both required; the
// API rejects requests without them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::publish::Publisher;

const API_BASE: &str = "https://api.linkedin.com/v2";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UgcPost {
    author: String,
    lifecycle_state: String,
    specific_content: SpecificContent,
    visibility: Visibility,
}

#[derive(Serialize)]
struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    share_content: ShareContent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareContent {
    share_commentary: ShareCommentary,
    share_media_category: String,
}

#[derive(Serialize)]
struct ShareCommentary {
    text: String,
}

#[derive(Serialize)]
struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    member_network_visibility: String,
}

#[derive(Deserialize)]
struct CreatedResponse {
    #[serde(default)]
    id: String,
}

impl UgcPost {
    fn text_share(person_urn: &str, text: &str) -> Self {
        Self {
            author: format!("urn:li:person:{person_urn}"),
            lifecycle_state: "PUBLISHED".to_string(),
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: ShareCommentary {
                        text: text.to_string(),
                    },
                    share_media_category: "NONE".to_string(),
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC".to_string(),
            },
        }
    }
}

/// Client for the LinkedIn v2 API.
pub struct LinkedInClient {
    client: reqwest::Client,
    access_token: String,
    person_urn: String,
}

impl LinkedInClient {
    pub fn new(access_token: &str, person_urn: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            person_urn: person_urn.to_string(),
        })
    }

    /// Check that the access token still works (GET /me).
    pub async fn verify_credentials(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{API_BASE}/me"))
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .send()
            .await
            .context("LinkedIn credential check failed")?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Publisher for LinkedInClient {
    /// Create a public text share. Returns the new post's URN.
    async fn create_post(&self, text: &str) -> Result<String> {
        let payload = UgcPost::text_share(&self.person_urn, text);

        let response = self
            .client
            .post(format!("{API_BASE}/ugcPosts"))
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .context("LinkedIn publish request failed")?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LinkedIn API returned {}: {}", status, body);
        }

        let created: CreatedResponse = response
            .json()
            .await
            .context("Failed to parse LinkedIn response")?;

        Ok(created.id)
    }
}
