/// HTTP client for the social backend (followers, following, posts, follow toggle)
///
/// Every endpoint is a JSON `POST` answering `{ status, data, message }`.
/// A response counts as successful only when the HTTP status is 2xx and
/// `status == "success"`.
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::SocialBackend;
use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::models::{ApiEnvelope, Post, Relationship, Session};

#[derive(Clone)]
pub struct SocialApiClient {
    client: Client,
    base_url: String,
}

impl SocialApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_envelope<Req, Res>(&self, endpoint: &str, body: &Req) -> Result<Option<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            error!("Request to {} failed: {}", endpoint, e);
            AppError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        let envelope = response
            .json::<ApiEnvelope<Res>>()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: parse failed: {}", endpoint, e)))?;

        if !envelope.is_success() {
            return Err(AppError::Upstream(format!(
                "{}: {}",
                endpoint,
                envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", envelope.status))
            )));
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl SocialBackend for SocialApiClient {
    async fn fetch_followers(&self, session: &Session) -> Result<Vec<Relationship>> {
        let body = json!({ "token": session.token, "userId": session.viewer_id });
        Ok(self
            .post_envelope::<_, Vec<Relationship>>("getFollowers", &body)
            .await?
            .unwrap_or_default())
    }

    async fn fetch_following(&self, session: &Session) -> Result<Vec<Relationship>> {
        let body = json!({ "token": session.token, "userId": session.viewer_id });
        Ok(self
            .post_envelope::<_, Vec<Relationship>>("getFollowing", &body)
            .await?
            .unwrap_or_default())
    }

    async fn fetch_posts_by_author(
        &self,
        session: &Session,
        author_id: &str,
    ) -> Result<Vec<Post>> {
        let body = json!({ "token": session.token, "UserId": author_id });
        let raw = self
            .post_envelope::<_, Vec<serde_json::Value>>("getUserPosts", &body)
            .await?
            .unwrap_or_default();

        // Decode post by post so one malformed entry does not cost the whole page.
        let posts = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Post>(value) {
                Ok(mut post) => {
                    if post.author_id.is_empty() {
                        post.author_id = author_id.to_string();
                    }
                    Some(post)
                }
                Err(e) => {
                    warn!("Skipping undecodable post from {}: {}", author_id, e);
                    None
                }
            })
            .collect();

        Ok(posts)
    }

    async fn set_follow_state(
        &self,
        session: &Session,
        target_id: &str,
        desired: bool,
    ) -> Result<()> {
        let endpoint = if desired { "follow" } else { "unfollow" };
        let body = json!({
            "token": session.token,
            "userId": session.viewer_id,
            "targetId": target_id,
        });
        self.post_envelope::<_, serde_json::Value>(endpoint, &body)
            .await?;
        Ok(())
    }
}
