//! Sonarr webhook payload

use serde::{Deserialize, Serialize};

/// The slice of Sonarr's webhook body the monitor acts on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SonarrWebhookData {
    pub event_type: String,
    pub series: Series,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub tvdb_id: i64,
    pub imdb_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub id: i64,
    pub episode_number: i64,
    pub season_number: i64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_series_add_payload() {
        let body = serde_json::json!({
            "eventType": "SeriesAdd",
            "series": {"id": 5, "title": "Foo", "tvdbId": 121361},
        });

        let data: SonarrWebhookData = serde_json::from_value(body).unwrap();
        assert_eq!(data.event_type, "SeriesAdd");
        assert_eq!(data.series.title, "Foo");
        assert!(data.episodes.is_empty());
    }
}
