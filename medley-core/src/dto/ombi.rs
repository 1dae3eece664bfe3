//! Ombi webhook payload

use serde::{Deserialize, Serialize};

/// Notification type Ombi sends when a user files a new request.
pub const NEW_REQUEST_NOTIFICATION: &str = "NewRequest";

/// The slice of Ombi's webhook body the monitor acts on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OmbiWebhookData {
    pub request_id: String,
    pub requested_user: String,
    pub title: String,
    pub requested_date: String,
    /// `"TV Show"` or `"Movie"`.
    #[serde(rename = "type")]
    pub media_type: String,
    pub user_name: String,
    pub alias: String,
    pub notification_type: String,
    pub application_name: String,
    pub application_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_new_request_payload() {
        let body = serde_json::json!({
            "requestId": "42",
            "title": "Foo",
            "type": "TV Show",
            "userName": "alice",
            "notificationType": "NewRequest",
            "applicationName": "Ombi",
            "posterImage": "ignored-field"
        });

        let data: OmbiWebhookData = serde_json::from_value(body).unwrap();
        assert_eq!(data.request_id, "42");
        assert_eq!(data.media_type, "TV Show");
        assert_eq!(data.notification_type, NEW_REQUEST_NOTIFICATION);
        assert_eq!(data.alias, "");
    }
}
