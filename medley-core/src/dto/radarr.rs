//! Radarr webhook payload

use serde::{Deserialize, Serialize};

/// The slice of Radarr's webhook body the monitor acts on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RadarrWebhookData {
    pub event_type: String,
    pub movie: Movie,
    pub release: Option<Release>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: i64,
    pub tmdb_id: i64,
    pub imdb_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Release {
    pub quality: String,
    pub release_title: String,
    pub indexer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_movie_added_payload() {
        let body = serde_json::json!({
            "eventType": "MovieAdded",
            "movie": {"id": 7, "title": "Bar", "year": 2019, "tmdbId": 603},
        });

        let data: RadarrWebhookData = serde_json::from_value(body).unwrap();
        assert_eq!(data.event_type, "MovieAdded");
        assert_eq!(data.movie.title, "Bar");
        assert!(data.release.is_none());
    }
}
