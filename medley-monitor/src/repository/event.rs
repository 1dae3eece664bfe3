//! Webhook event archive
//!
//! Every inbound payload is archived verbatim before any pipeline work, so a
//! mis-mapped event can be replayed after a fix. Health notifications from
//! the *arr services get their own log.

use medley_core::dto::servarr::ServarrHealthData;
use sqlx::PgPool;

/// Archive a raw webhook payload.
pub async fn archive(
    pool: &PgPool,
    service: &str,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO webhook_events (service, event_type, payload, received_at)
        VALUES ($1, $2, $3, NOW())
        "#,
    )
    .bind(service)
    .bind(event_type)
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a health notification.
pub async fn archive_health(
    pool: &PgPool,
    service: &str,
    health: &ServarrHealthData,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO service_health_events (service, event_type, level, message, wiki_url, received_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(service)
    .bind(&health.event_type)
    .bind(&health.level)
    .bind(&health.message)
    .bind(&health.wiki_url)
    .execute(pool)
    .await?;

    Ok(())
}
