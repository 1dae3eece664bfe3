//! Ombi HTTP client
//!
//! Ombi is where requests originate, and its user directory is the bridge
//! between the requesting username and the Discord handle used to notify the
//! requester later. Authentication is the `ApiKey` header Ombi expects.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use super::{ClientError, Result};
use crate::directory::ServiceConfig;

const SERVICE: &str = "ombi";

/// Ombi's agent id for Discord notification preferences.
pub const DISCORD_AGENT_ID: i64 = 1;

/// A user in Ombi's directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OmbiUser {
    pub id: String,
    pub user_name: String,
    pub alias: String,
    pub email_address: String,
}

/// One notification-preference entry for a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreference {
    pub user_id: String,
    #[serde(rename = "agent")]
    pub agent_id: i64,
    pub enabled: bool,
    pub value: Option<String>,
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct OmbiClient {
    host: String,
    api_key: String,
    client: Client,
}

impl OmbiClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client: Client::new(),
        }
    }

    /// GET /ombi/api/v1/Identity/Users
    pub async fn users(&self) -> Result<Vec<OmbiUser>> {
        self.get_json("/ombi/api/v1/Identity/Users").await
    }

    /// GET /ombi/api/v1/Identity/notificationpreferences/{user_id}
    pub async fn notification_preferences(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationPreference>> {
        self.get_json(&format!(
            "/ombi/api/v1/Identity/notificationpreferences/{user_id}"
        ))
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.host, path))
            .header("ApiKey", &self.api_key)
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

/// Pick the directory entry matching the requesting username.
pub fn find_user<'a>(users: &'a [OmbiUser], user_name: &str) -> Option<&'a OmbiUser> {
    users.iter().find(|u| u.user_name == user_name)
}

/// Extract the Discord handle from a user's notification preferences.
pub fn discord_value(prefs: &[NotificationPreference], user_id: &str) -> Option<String> {
    prefs
        .iter()
        .find(|p| p.agent_id == DISCORD_AGENT_ID && p.user_id == user_id)
        .and_then(|p| p.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> OmbiUser {
        OmbiUser {
            id: id.to_string(),
            user_name: name.to_string(),
            ..OmbiUser::default()
        }
    }

    #[test]
    fn find_user_matches_on_username() {
        let users = vec![user("u1", "alice"), user("u2", "bob")];
        assert_eq!(find_user(&users, "bob").unwrap().id, "u2");
        assert!(find_user(&users, "carol").is_none());
    }

    #[test]
    fn discord_value_filters_agent_and_user() {
        let prefs = vec![
            NotificationPreference {
                user_id: "u1".into(),
                agent_id: 0, // email
                value: Some("alice@example.com".into()),
                ..NotificationPreference::default()
            },
            NotificationPreference {
                user_id: "u1".into(),
                agent_id: DISCORD_AGENT_ID,
                value: Some("123456789".into()),
                ..NotificationPreference::default()
            },
            NotificationPreference {
                user_id: "u2".into(),
                agent_id: DISCORD_AGENT_ID,
                value: Some("987654321".into()),
                ..NotificationPreference::default()
            },
        ];

        assert_eq!(discord_value(&prefs, "u1").as_deref(), Some("123456789"));
        assert_eq!(discord_value(&prefs, "u3"), None);
    }
}
