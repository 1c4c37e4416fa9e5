//! Munin error types

use std::time::Duration;

/// Munin error types
#[derive(Debug, thiserror::Error)]
pub enum MuninError {
    // Request errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Model lifecycle errors
    #[error("model failed to load: {0}")]
    ModelLoad(String),

    // Inference backend errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MuninError {
    /// Whether the error is worth retrying against the same backend.
    ///
    /// Network failures, rate limits, timeouts and 5xx responses are
    /// transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            MuninError::Http(_) | MuninError::RateLimited { .. } | MuninError::Timeout(_) => true,
            MuninError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Backend-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MuninError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Munin operations
pub type Result<T> = std::result::Result<T, MuninError>;
