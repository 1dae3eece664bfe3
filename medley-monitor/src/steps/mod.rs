//! Step handlers
//!
//! The concrete business logic behind each pipeline step. Handlers receive
//! the aggregate mutably; metadata they write persists atomically with the
//! step's status transition.

pub mod media_request;

use async_trait::async_trait;

/// Chat-platform seam for handlers that message the requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient_id: &str, message: &str) -> anyhow::Result<()>;
}
