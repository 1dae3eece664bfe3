//! Discord HTTP client
//!
//! Sends direct messages through the bot API: open (or reuse) the DM channel
//! for a recipient, then post the message into it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ClientError, Result};
use crate::steps::Notifier;

const SERVICE: &str = "discord";
const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    base_url: String,
    token: String,
    client: Client,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Point the client at a different API base. Used by tests.
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// DM `content` to the user with the given Discord id.
    pub async fn notify_user(&self, user_id: &str, content: &str) -> Result<()> {
        let channel: DmChannel = self
            .post_json(
                "/users/@me/channels",
                &json!({ "recipient_id": user_id }),
            )
            .await?;

        let _: serde_json::Value = self
            .post_json(
                &format!("/channels/{}/messages", channel.id),
                &json!({ "content": content }),
            )
            .await?;

        Ok(())
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.token))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(SERVICE, response).await);
        }

        response.json().await.map_err(|source| ClientError::ParseError {
            service: SERVICE,
            source,
        })
    }
}

#[async_trait]
impl Notifier for DiscordClient {
    async fn notify(&self, recipient_id: &str, message: &str) -> anyhow::Result<()> {
        self.notify_user(recipient_id, message).await?;
        Ok(())
    }
}
