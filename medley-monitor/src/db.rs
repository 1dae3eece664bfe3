use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table. Steps and metadata are JSONB documents; the
    // version column backs the optimistic-concurrency check on every upsert.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            steps JSONB NOT NULL DEFAULT '[]',
            current_step INTEGER NOT NULL DEFAULT 0,
            metadata JSONB NOT NULL DEFAULT '{}',
            version BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create service directory table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            service_name TEXT PRIMARY KEY,
            host TEXT NOT NULL,
            api_key TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create webhook archive table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_events (
            id BIGSERIAL PRIMARY KEY,
            service TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload JSONB NOT NULL,
            received_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create health-event log table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS service_health_events (
            id BIGSERIAL PRIMARY KEY,
            service TEXT NOT NULL,
            event_type TEXT NOT NULL,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            wiki_url TEXT NOT NULL DEFAULT '',
            received_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for archive lookups by service
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_webhook_events_service ON webhook_events(service, received_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_health_events_service ON service_health_events(service, received_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
