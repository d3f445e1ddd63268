//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Install-time precache failure, blocks activation
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    /// Upstream could not be reached or the transfer failed
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream did not answer within the configured window
    #[error("Network timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Write or delete against the cache store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unrecognized control message or sync tag
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Network and timeout failures trigger cache fallback and are handled alike.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Network(_) | CacheError::Timeout(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Provisioning(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Protocol(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
