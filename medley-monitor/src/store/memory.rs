//! In-memory pipeline store
//!
//! Same contract as the Postgres backend, including the version
//! compare-and-set. Used by the engine test-suite and handy for local runs
//! without a database.

use async_trait::async_trait;
use medley_core::domain::pipeline::Pipeline;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{PipelineStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryPipelineStore {
    inner: Mutex<HashMap<String, Pipeline>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn find(&self, id: &str) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.inner.lock().await.get(id).cloned())
    }

    async fn insert(&self, pipeline: &Pipeline) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.contains_key(&pipeline.id) {
            return Err(StoreError::AlreadyExists {
                id: pipeline.id.clone(),
            });
        }
        inner.insert(pipeline.id.clone(), pipeline.clone());
        Ok(())
    }

    async fn update(&self, pipeline: &Pipeline) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.get_mut(&pipeline.id) {
            Some(stored) if stored.version == pipeline.version => {
                *stored = pipeline.clone();
                stored.version += 1;
                Ok(stored.version)
            }
            _ => Err(StoreError::VersionConflict {
                id: pipeline.id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::domain::pipeline::{MEDIA_REQUEST_PIPELINE_NAME, StepKey};

    fn pipeline(id: &str) -> Pipeline {
        let mut p = Pipeline::new(id, MEDIA_REQUEST_PIPELINE_NAME);
        p.add_step("User Requested", StepKey::Requested);
        p
    }

    #[tokio::test]
    async fn insert_is_first_writer_wins() {
        let store = MemoryPipelineStore::new();
        store.insert(&pipeline("TVo_oFoo")).await.unwrap();

        let err = store.insert(&pipeline("TVo_oFoo")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn stale_update_is_a_version_conflict() {
        let store = MemoryPipelineStore::new();
        store.insert(&pipeline("TVo_oFoo")).await.unwrap();

        // First writer bumps the stored version.
        let fresh = store.find("TVo_oFoo").await.unwrap().unwrap();
        assert_eq!(store.update(&fresh).await.unwrap(), 1);

        // A copy read before that write is now stale.
        let err = store.update(&fresh).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn update_of_a_missing_document_conflicts() {
        let store = MemoryPipelineStore::new();
        let err = store.update(&pipeline("TVo_oGone")).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }
}
