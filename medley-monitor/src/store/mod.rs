//! Pipeline persistence
//!
//! [`PipelineStore`] is the storage contract for pipeline documents: get by
//! id, insert-if-absent, and a compare-and-set update keyed on the document
//! version. One backend talks to Postgres; the in-memory backend carries the
//! same semantics for the engine test-suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use medley_core::domain::pipeline::Pipeline;
use thiserror::Error;

pub use memory::MemoryPipelineStore;
pub use postgres::PgPipelineStore;

/// Storage errors, kept distinct from step-handler failures so callers can
/// tell "the transition may not have persisted" from "the step's work
/// failed".
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert lost a create race; the caller re-reads the winner's document.
    #[error("pipeline {id} already exists")]
    AlreadyExists { id: String },

    /// Compare-and-set update saw a stale version; the caller retries its
    /// whole read-modify-write with a fresh read.
    #[error("pipeline {id} was modified concurrently")]
    VersionConflict { id: String },

    #[error("failed to (de)serialize pipeline document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage contract for pipeline documents.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn
/// PipelineStore>`.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Fetch a pipeline by id. `Ok(None)` when no document exists yet.
    async fn find(&self, id: &str) -> Result<Option<Pipeline>, StoreError>;

    /// Insert a new document. Fails with [`StoreError::AlreadyExists`] when a
    /// concurrent first-caller won the create race.
    async fn insert(&self, pipeline: &Pipeline) -> Result<(), StoreError>;

    /// Persist the whole document, compare-and-set on `pipeline.version`.
    /// Returns the new version on success; [`StoreError::VersionConflict`]
    /// when the stored version no longer matches.
    async fn update(&self, pipeline: &Pipeline) -> Result<i64, StoreError>;
}
