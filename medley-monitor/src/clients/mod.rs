//! REST clients for the downstream services
//!
//! Step handlers call out through these; retry/backoff policy beyond a
//! single attempt is the caller's concern; a failed call fails the step,
//! and the step is retried on the next delivery.

pub mod discord;
pub mod ombi;

use thiserror::Error;

pub use discord::DiscordClient;
pub use ombi::OmbiClient;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when calling a downstream service
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Service returned an error status code
    #[error("{service} returned status {status}: {message}")]
    ApiError {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Failed to parse a response body
    #[error("failed to parse {service} response: {source}")]
    ParseError {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ClientError {
    pub(crate) async fn from_response(
        service: &'static str,
        response: reqwest::Response,
    ) -> Self {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ClientError::ApiError {
            service,
            status,
            message,
        }
    }
}
