//! Service directory
//!
//! Connection config (host + credential) for the downstream services, looked
//! up by name from step handlers. Persisted in the `services` table and
//! seeded from the environment at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;

use crate::store::StoreError;

/// Known downstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Ombi,
    Sonarr,
    Radarr,
    Discord,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Ombi => "ombi",
            ServiceName::Sonarr => "sonarr",
            ServiceName::Radarr => "radarr",
            ServiceName::Discord => "discord",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection config for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub api_key: String,
}

/// Lookup of service connection config by name.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn find(&self, name: ServiceName) -> Result<Option<ServiceConfig>, StoreError>;

    async fn upsert(&self, name: ServiceName, config: &ServiceConfig) -> Result<(), StoreError>;
}

/// Directory backed by the `services` table.
#[derive(Debug, Clone)]
pub struct PgServiceDirectory {
    pool: PgPool,
}

impl PgServiceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceDirectory for PgServiceDirectory {
    async fn find(&self, name: ServiceName) -> Result<Option<ServiceConfig>, StoreError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT host, api_key FROM services WHERE service_name = $1",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(host, api_key)| ServiceConfig { host, api_key }))
    }

    async fn upsert(&self, name: ServiceName, config: &ServiceConfig) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO services (service_name, host, api_key, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (service_name)
            DO UPDATE SET host = $2, api_key = $3, updated_at = NOW()
            "#,
        )
        .bind(name.as_str())
        .bind(&config.host)
        .bind(&config.api_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory directory for tests.
#[derive(Debug, Default)]
pub struct MemoryServiceDirectory {
    inner: Mutex<HashMap<ServiceName, ServiceConfig>>,
}

impl MemoryServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceDirectory for MemoryServiceDirectory {
    async fn find(&self, name: ServiceName) -> Result<Option<ServiceConfig>, StoreError> {
        Ok(self.inner.lock().await.get(&name).cloned())
    }

    async fn upsert(&self, name: ServiceName, config: &ServiceConfig) -> Result<(), StoreError> {
        self.inner.lock().await.insert(name, config.clone());
        Ok(())
    }
}
