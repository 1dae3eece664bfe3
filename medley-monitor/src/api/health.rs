//! Health Check API Handler

use axum::{Json, response::IntoResponse};
use serde_json::json;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "success": true }))
}
