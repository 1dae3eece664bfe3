//! API Module
//!
//! HTTP layer: one webhook endpoint per monitored service plus a health
//! check. Webhook handlers archive, map, and return; pipeline work happens
//! on detached tasks.

pub mod error;
pub mod health;
pub mod webhook;

use axum::{Router, routing::{get, post}};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::PipelineEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<PipelineEngine>,
}

/// Create the main router with all endpoints
pub fn create_router(pool: PgPool, engine: Arc<PipelineEngine>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Webhook endpoints, one per upstream service
        .route("/webhook/ombi", post(webhook::ombi_webhook))
        .route("/webhook/sonarr", post(webhook::sonarr_webhook))
        .route("/webhook/radarr", post(webhook::radarr_webhook))
        // Add state and middleware
        .with_state(AppState { pool, engine })
        .layer(TraceLayer::new_for_http())
}
