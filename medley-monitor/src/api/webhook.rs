//! Webhook API Handlers
//!
//! One endpoint per monitored service. Each handler parses the
//! service-specific payload, archives it verbatim, and hands the event to
//! the ingest layer; pipeline advancement runs on detached tasks and never
//! blocks the webhook response. Step failures are therefore not surfaced
//! here; redelivery retries them.

use axum::{Json, extract::State};
use medley_core::dto::ombi::OmbiWebhookData;
use medley_core::dto::radarr::RadarrWebhookData;
use medley_core::dto::servarr::{ServarrHealthData, is_health_event};
use medley_core::dto::sonarr::SonarrWebhookData;
use serde_json::json;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::ingest;
use crate::repository::event_repository;

/// POST /webhook/ombi
pub async fn ombi_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    tracing::info!("Firing webhook for Ombi");

    let data: OmbiWebhookData = parse(&payload)?;
    event_repository::archive(&state.pool, "ombi", &data.notification_type, &payload).await?;

    ingest::ingest_ombi(state.engine.clone(), data)
        .await
        .map_err(|err| ApiError::InternalError(format!("unable to run pipelines: {err}")))?;

    Ok(Json(json!({ "success": true })))
}

/// POST /webhook/sonarr
pub async fn sonarr_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    tracing::info!("Firing webhook for Sonarr");

    let event_type = event_type_of(&payload);

    // Health notifications carry a different shape and never touch a
    // pipeline.
    if is_health_event(&event_type) {
        let health: ServarrHealthData = parse(&payload)?;
        event_repository::archive_health(&state.pool, "sonarr", &health).await?;
        return Ok(Json(json!({ "success": true })));
    }

    let data: SonarrWebhookData = parse(&payload)?;
    event_repository::archive(&state.pool, "sonarr", &event_type, &payload).await?;

    ingest::ingest_sonarr(state.engine.clone(), data)
        .await
        .map_err(|err| ApiError::InternalError(format!("unable to run pipelines: {err}")))?;

    Ok(Json(json!({ "success": true })))
}

/// POST /webhook/radarr
pub async fn radarr_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    tracing::info!("Firing webhook for Radarr");

    let event_type = event_type_of(&payload);

    if is_health_event(&event_type) {
        let health: ServarrHealthData = parse(&payload)?;
        event_repository::archive_health(&state.pool, "radarr", &health).await?;
        return Ok(Json(json!({ "success": true })));
    }

    let data: RadarrWebhookData = parse(&payload)?;
    event_repository::archive(&state.pool, "radarr", &event_type, &payload).await?;

    ingest::ingest_radarr(state.engine.clone(), data)
        .await
        .map_err(|err| ApiError::InternalError(format!("unable to run pipelines: {err}")))?;

    Ok(Json(json!({ "success": true })))
}

fn parse<T: serde::de::DeserializeOwned>(payload: &serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(payload.clone())
        .map_err(|err| ApiError::BadRequest(format!("bad request data: {err}")))
}

fn event_type_of(payload: &serde_json::Value) -> String {
    payload
        .get("eventType")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}
