//! Postgres pipeline store

use async_trait::async_trait;
use medley_core::domain::pipeline::Pipeline;
use sqlx::PgPool;

use super::{PipelineStore, StoreError};

/// Pipeline store backed by the `pipelines` table.
///
/// Steps and metadata are stored as JSONB documents; the version column
/// carries the optimistic-concurrency counter.
#[derive(Debug, Clone)]
pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn find(&self, id: &str) -> Result<Option<Pipeline>, StoreError> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, name, steps, current_step, metadata, version
            FROM pipelines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Pipeline::try_from).transpose()
    }

    async fn insert(&self, pipeline: &Pipeline) -> Result<(), StoreError> {
        let steps = serde_json::to_value(&pipeline.steps)?;
        let metadata = serde_json::to_value(&pipeline.metadata)?;

        let result = sqlx::query(
            r#"
            INSERT INTO pipelines (id, name, steps, current_step, metadata, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&pipeline.id)
        .bind(&pipeline.name)
        .bind(steps)
        .bind(pipeline.current_step as i32)
        .bind(metadata)
        .bind(pipeline.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::AlreadyExists {
                id: pipeline.id.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, pipeline: &Pipeline) -> Result<i64, StoreError> {
        let steps = serde_json::to_value(&pipeline.steps)?;
        let metadata = serde_json::to_value(&pipeline.metadata)?;

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE pipelines
            SET name = $2, steps = $3, current_step = $4, metadata = $5,
                version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING version
            "#,
        )
        .bind(&pipeline.id)
        .bind(&pipeline.name)
        .bind(steps)
        .bind(pipeline.current_step as i32)
        .bind(metadata)
        .bind(pipeline.version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((version,)) => Ok(version),
            None => Err(StoreError::VersionConflict {
                id: pipeline.id.clone(),
            }),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: String,
    name: String,
    steps: serde_json::Value,
    current_step: i32,
    metadata: serde_json::Value,
    version: i64,
}

impl TryFrom<PipelineRow> for Pipeline {
    type Error = StoreError;

    fn try_from(row: PipelineRow) -> Result<Self, Self::Error> {
        Ok(Pipeline {
            id: row.id,
            name: row.name,
            steps: serde_json::from_value(row.steps)?,
            current_step: row.current_step.max(0) as usize,
            metadata: serde_json::from_value(row.metadata)?,
            version: row.version,
        })
    }
}
