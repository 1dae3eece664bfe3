//! Health events shared by the *arr services
//!
//! Sonarr and Radarr both deliver `Health`/`HealthRestored` issues through the
//! same webhook endpoint as lifecycle events; these never touch a pipeline and
//! are archived to their own log.

use serde::{Deserialize, Serialize};

/// Event types containing this marker are health notifications.
pub const HEALTH_EVENT_MARKER: &str = "Health";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServarrHealthData {
    pub event_type: String,
    pub level: String,
    pub message: String,
    pub wiki_url: String,
}

/// Whether an event type names a health notification rather than a lifecycle
/// event (`"Health"`, `"HealthRestored"`, ...).
pub fn is_health_event(event_type: &str) -> bool {
    event_type.contains(HEALTH_EVENT_MARKER)
}
