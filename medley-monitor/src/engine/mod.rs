//! Pipeline engine
//!
//! Get-or-create construction plus the step runner: advance a named step, or
//! retire it, under concurrent uncoordinated callers. Two mechanisms keep
//! that safe, each covering a different failure domain:
//!
//! - a per-pipeline-id mutex serializes every read-modify-write in this
//!   process, including the handler invocation, so duplicate deliveries
//!   cannot run one step's side effect twice. Different ids never contend.
//! - every upsert is a compare-and-set on the document version, so a second
//!   process replica cannot silently overwrite this one's transition. A
//!   conflict restarts the whole sequence with a fresh read, which re-runs
//!   the idempotency checks.

mod lock;

use chrono::Utc;
use medley_core::domain::media::MediaKind;
use medley_core::domain::pipeline::{Pipeline, StepKey, StepStatus};
use std::sync::Arc;
use thiserror::Error;

use crate::registry::StepRegistry;
use crate::store::{PipelineStore, StoreError};
use lock::LockMap;

/// CAS attempts per operation before giving up. Conflicts only arise from
/// another replica writing the same document, so contention is short-lived.
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Engine errors, split so callers can tell "wait for redelivery" from
/// "alert and fix the deploy".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no pipeline with id {id:?}")]
    NotFound { id: String },

    /// Persisted schema and registry disagree: fatal configuration drift,
    /// not retryable without a deploy fix.
    #[error("pipeline {id:?} has no registered handler for step {key:?}")]
    UnknownStep { id: String, key: StepKey },

    /// The step's business logic failed. The step is persisted as failed and
    /// the next delivery for the same key retries it.
    #[error("step {key} failed: {source}")]
    Step {
        key: StepKey,
        #[source]
        source: anyhow::Error,
    },

    /// Concurrent writers kept invalidating our read; bounded retries ran
    /// out.
    #[error("pipeline {id} kept conflicting after {attempts} attempts")]
    Conflict { id: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Derive the pipeline id for a logical media item.
///
/// Pure function of (kind, title): independent events about the same item
/// resolve to the same aggregate. The `o_o` infix is the collision guard: it
/// does not occur in normal title text, so distinct (kind, title) pairs
/// cannot concatenate to the same id.
pub fn generate_id(kind: MediaKind, title: &str) -> String {
    format!("{}o_o{}", kind.as_str(), title)
}

/// The progression engine for one pipeline type.
///
/// Store and registry are injected at construction; the engine holds no
/// global state.
pub struct PipelineEngine {
    store: Arc<dyn PipelineStore>,
    registry: Arc<StepRegistry>,
    locks: LockMap,
}

impl PipelineEngine {
    pub fn new(store: Arc<dyn PipelineStore>, registry: Arc<StepRegistry>) -> Self {
        Self {
            store,
            registry,
            locks: LockMap::new(),
        }
    }

    /// Fetch the pipeline for (kind, title), creating it on first contact.
    ///
    /// Safe under concurrent first-callers: in-process racers queue on the
    /// per-id lock, and a cross-process racer that loses the insert re-reads
    /// the winner's document.
    pub async fn get_or_create(
        &self,
        kind: MediaKind,
        title: &str,
    ) -> Result<Pipeline, EngineError> {
        let id = generate_id(kind, title);
        let lock = self.locks.for_id(&id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.find(&id).await? {
            return self.validated(existing);
        }

        let fresh = self.registry.blueprint(id.clone());
        match self.store.insert(&fresh).await {
            Ok(()) => {
                tracing::info!(pipeline = %id, "created pipeline");
                Ok(fresh)
            }
            Err(StoreError::AlreadyExists { .. }) => self.load(&id).await,
            Err(err) => Err(err.into()),
        }
    }

    /// Advance the named step.
    ///
    /// A step already succeeded or skipped is a no-op success; that is the
    /// idempotency guarantee for duplicate and redelivered events. A failed
    /// step is retried from scratch.
    pub async fn run_step(&self, id: &str, key: StepKey) -> Result<(), EngineError> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut pipeline = self.load(id).await?;
            let idx = pipeline
                .step_index(key)
                .ok_or_else(|| EngineError::UnknownStep {
                    id: id.to_string(),
                    key,
                })?;

            match pipeline.steps[idx].status {
                StepStatus::Success => {
                    tracing::debug!(pipeline = %id, step = %key, "step already complete");
                    return Ok(());
                }
                StepStatus::Skipped => {
                    tracing::debug!(pipeline = %id, step = %key, "step was skipped, not running");
                    return Ok(());
                }
                StepStatus::Pending | StepStatus::Failed => {}
            }

            pipeline.current_step = idx;
            pipeline.steps[idx].mark_started(Utc::now());

            let handler = self
                .registry
                .handler(key)
                .ok_or_else(|| EngineError::UnknownStep {
                    id: id.to_string(),
                    key,
                })?;

            tracing::info!(pipeline = %id, step = %key, "running step");
            let failure = match handler.run(&mut pipeline).await {
                Ok(()) => {
                    pipeline.steps[idx].mark_success(Utc::now());
                    None
                }
                Err(source) => {
                    pipeline.steps[idx].mark_failed();
                    Some(source)
                }
            };

            match self.store.update(&pipeline).await {
                Ok(_) => {
                    return match failure {
                        Some(source) => {
                            tracing::warn!(pipeline = %id, step = %key, error = %source, "step failed");
                            Err(EngineError::Step { key, source })
                        }
                        None => {
                            tracing::info!(pipeline = %id, step = %key, "finished running step");
                            Ok(())
                        }
                    };
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::warn!(pipeline = %id, step = %key, attempt, "concurrent update, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Conflict {
            id: id.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Retire the named step: the loser of a mutually-exclusive
    /// alternate-path race must never run.
    ///
    /// Pending and failed steps become skipped. Terminal steps stay put; in
    /// particular a step that already succeeded keeps its win even when the
    /// losing path's event arrives late carrying a skip for it.
    pub async fn mark_step_skipped(&self, id: &str, key: StepKey) -> Result<(), EngineError> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut pipeline = self.load(id).await?;
            let idx = pipeline
                .step_index(key)
                .ok_or_else(|| EngineError::UnknownStep {
                    id: id.to_string(),
                    key,
                })?;

            if pipeline.steps[idx].status.is_terminal() {
                tracing::debug!(pipeline = %id, step = %key, "step already settled, not skipping");
                return Ok(());
            }

            pipeline.current_step = idx;
            pipeline.steps[idx].mark_skipped();

            match self.store.update(&pipeline).await {
                Ok(_) => {
                    tracing::info!(pipeline = %id, step = %key, "marked step as skipped");
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::warn!(pipeline = %id, step = %key, attempt, "concurrent update, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Conflict {
            id: id.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Replace `metadata[namespace]` wholesale and persist.
    pub async fn add_metadata(
        &self,
        id: &str,
        namespace: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut pipeline = self.load(id).await?;
            pipeline.insert_metadata(namespace, value.clone());

            match self.store.update(&pipeline).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::warn!(pipeline = %id, namespace, attempt, "concurrent update, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Conflict {
            id: id.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    async fn load(&self, id: &str) -> Result<Pipeline, EngineError> {
        let pipeline = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| EngineError::NotFound { id: id.to_string() })?;
        self.validated(pipeline)
    }

    /// Handlers are re-attached by key whenever a document is loaded; a step
    /// with no registry entry means the stored schema and the code have
    /// drifted and must be surfaced, not ignored.
    fn validated(&self, pipeline: Pipeline) -> Result<Pipeline, EngineError> {
        match self.registry.validate(&pipeline) {
            Ok(()) => Ok(pipeline),
            Err(key) => {
                tracing::error!(
                    pipeline = %pipeline.id,
                    step = %key,
                    "persisted step has no registered handler; registry and schema have drifted"
                );
                Err(EngineError::UnknownStep {
                    id: pipeline.id,
                    key,
                })
            }
        }
    }
}
