//! Pipeline domain types
//!
//! The pipeline aggregate: a persisted, resumable, named-step state machine
//! tracking one media request across the services that handle it. The monitor
//! persists the whole document on every mutation; step handler functions are
//! never persisted and are re-attached from the step registry on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label shared by every media-request pipeline document.
pub const MEDIA_REQUEST_PIPELINE_NAME: &str = "Media Request";

/// One media request's progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Deterministic id derived from (media kind, title); primary key.
    pub id: String,
    /// Pipeline-type label.
    pub name: String,
    /// Ordered step list; cardinality and order are fixed per pipeline type.
    pub steps: Vec<Step>,
    /// Index of the step most recently touched. Observability only; never
    /// consulted when deciding whether a step may run.
    pub current_step: usize,
    /// Namespace -> value. Each event source owns one top-level namespace and
    /// writes to it wholesale.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optimistic-concurrency counter, bumped by the store on every upsert.
    #[serde(default)]
    pub version: i64,
}

/// A single named step within a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub key: StepKey,
    pub status: StepStatus,
    /// Stamped on the first execution attempt, not at construction; a step
    /// that never ran carries no start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Stamped exactly once, on the transition into `Success`.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Step execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Terminal states never transition again and never execute a handler.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Skipped)
    }
}

/// Stable step identifier, unique within a pipeline's step list.
///
/// Serialized to the wire keys the persisted documents use; handlers are
/// resolved by variant, not by re-parsed strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepKey {
    #[serde(rename = "user_requested")]
    Requested,
    #[serde(rename = "request_ingested_by_sonarr")]
    IngestedBySonarr,
    #[serde(rename = "request_ingested_by_radarr")]
    IngestedByRadarr,
    #[serde(rename = "request_downloading")]
    Downloading,
    #[serde(rename = "request_downloaded")]
    Downloaded,
    #[serde(rename = "request_imported")]
    Imported,
}

impl StepKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKey::Requested => "user_requested",
            StepKey::IngestedBySonarr => "request_ingested_by_sonarr",
            StepKey::IngestedByRadarr => "request_ingested_by_radarr",
            StepKey::Downloading => "request_downloading",
            StepKey::Downloaded => "request_downloaded",
            StepKey::Imported => "request_imported",
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted step key with no matching variant: the stored schema and the
/// code have drifted.
#[derive(Debug, thiserror::Error)]
#[error("unknown step key: {0:?}")]
pub struct UnknownStepKey(pub String);

impl FromStr for StepKey {
    type Err = UnknownStepKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_requested" => Ok(StepKey::Requested),
            "request_ingested_by_sonarr" => Ok(StepKey::IngestedBySonarr),
            "request_ingested_by_radarr" => Ok(StepKey::IngestedByRadarr),
            "request_downloading" => Ok(StepKey::Downloading),
            "request_downloaded" => Ok(StepKey::Downloaded),
            "request_imported" => Ok(StepKey::Imported),
            _ => Err(UnknownStepKey(s.to_string())),
        }
    }
}

impl Pipeline {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Pipeline {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            current_step: 0,
            metadata: BTreeMap::new(),
            version: 0,
        }
    }

    /// Append a pending step. Step lists are built once, at pipeline-type
    /// construction; keys must not repeat.
    pub fn add_step(&mut self, name: impl Into<String>, key: StepKey) {
        debug_assert!(
            self.step(key).is_none(),
            "duplicate step key {key} in pipeline {}",
            self.id
        );
        self.steps.push(Step {
            name: name.into(),
            key,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
        });
    }

    pub fn step(&self, key: StepKey) -> Option<&Step> {
        self.steps.iter().find(|s| s.key == key)
    }

    pub fn step_mut(&mut self, key: StepKey) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.key == key)
    }

    pub fn step_index(&self, key: StepKey) -> Option<usize> {
        self.steps.iter().position(|s| s.key == key)
    }

    /// Replace the value under `namespace` wholesale. Callers that want to
    /// extend an existing namespace read it first and write back the merge.
    pub fn insert_metadata(&mut self, namespace: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(namespace.into(), value);
    }

    pub fn metadata(&self, namespace: &str) -> Option<&serde_json::Value> {
        self.metadata.get(namespace)
    }
}

impl Step {
    /// Record the first execution attempt. Later attempts keep the original
    /// start time.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.started_at.get_or_insert(now);
    }

    pub fn mark_success(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::Success;
        self.completed_at = Some(now);
    }

    pub fn mark_failed(&mut self) {
        self.status = StepStatus::Failed;
    }

    pub fn mark_skipped(&mut self) {
        self.status = StepStatus::Skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_with_steps() -> Pipeline {
        let mut p = Pipeline::new("TVo_oFoo", MEDIA_REQUEST_PIPELINE_NAME);
        p.add_step("User Requested", StepKey::Requested);
        p.add_step("Request Imported", StepKey::Imported);
        p
    }

    #[test]
    fn steps_are_looked_up_by_key() {
        let p = pipeline_with_steps();
        assert_eq!(p.step_index(StepKey::Imported), Some(1));
        assert!(p.step(StepKey::Downloading).is_none());
    }

    #[test]
    fn new_steps_are_pending_and_unstarted() {
        let p = pipeline_with_steps();
        let step = p.step(StepKey::Requested).unwrap();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.started_at.is_none());
        assert!(step.completed_at.is_none());
    }

    #[test]
    fn metadata_namespaces_replace_wholesale() {
        let mut p = pipeline_with_steps();
        p.insert_metadata("ombi", json!({"userName": "alice"}));
        p.insert_metadata("sonarr", json!({"seriesId": 12}));
        p.insert_metadata("ombi", json!({"userName": "bob"}));

        assert_eq!(p.metadata("ombi").unwrap()["userName"], "bob");
        assert_eq!(p.metadata("sonarr").unwrap()["seriesId"], 12);
    }

    #[test]
    fn mark_started_keeps_the_first_attempt_time() {
        let mut p = pipeline_with_steps();
        let first = Utc::now();
        let step = p.step_mut(StepKey::Requested).unwrap();
        step.mark_started(first);
        step.mark_started(first + chrono::Duration::seconds(30));
        assert_eq!(step.started_at, Some(first));
    }

    #[test]
    fn persisted_layout_uses_wire_names() {
        let mut p = pipeline_with_steps();
        p.step_mut(StepKey::Requested).unwrap().mark_success(Utc::now());

        let doc = serde_json::to_value(&p).unwrap();
        assert_eq!(doc["name"], MEDIA_REQUEST_PIPELINE_NAME);
        assert_eq!(doc["steps"][0]["key"], "user_requested");
        assert_eq!(doc["steps"][0]["status"], "success");
        assert_eq!(doc["steps"][1]["status"], "pending");
        assert_eq!(doc["steps"][1]["completed_at"], serde_json::Value::Null);
    }

    #[test]
    fn step_keys_round_trip_through_strings() {
        for key in [
            StepKey::Requested,
            StepKey::IngestedBySonarr,
            StepKey::IngestedByRadarr,
            StepKey::Downloading,
            StepKey::Downloaded,
            StepKey::Imported,
        ] {
            assert_eq!(key.as_str().parse::<StepKey>().unwrap(), key);
        }
        assert!("request_transcoded".parse::<StepKey>().is_err());
    }
}
