//! Media kind classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of tracked media item.
///
/// Every upstream service reports this slightly differently (Ombi sends
/// `"TV Show"`, the indexer hooks are per-kind), so all inbound spellings are
/// normalized here before the pipeline id is derived, otherwise one title
/// can end up split across two pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Tv,
    Movie,
}

impl MediaKind {
    /// Canonical form used in pipeline ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Tv => "TV",
            MediaKind::Movie => "Movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an inbound payload carries a media type no adapter recognizes.
#[derive(Debug, thiserror::Error)]
#[error("unknown media kind: {0:?}")]
pub struct UnknownMediaKind(pub String);

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tv" | "tv show" | "tvshow" | "series" => Ok(MediaKind::Tv),
            "movie" => Ok(MediaKind::Movie),
            _ => Err(UnknownMediaKind(s.to_string())),
        }
    }
}
