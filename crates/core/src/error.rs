//! Error types for the heliolab domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all heliolab operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing request fields, rejected before any session
    /// or gateway interaction.
    #[error("Validation error: {message}")]
    Validation { message: String },

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Lookup on an absent or expired key. Only surfaced on explicit
    /// read-only queries; get-or-create paths never raise it.
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Failures at the model gateway boundary.
///
/// Every non-success outcome of a model call maps into one of these
/// variants; callers treat them uniformly as a recoverable failure for
/// that single exchange and never inspect provider-specific bodies.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Request timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },
}

impl GatewayError {
    /// Whether a retry of the same request could plausibly succeed.
    /// Timeouts and malformed replies are not retried; rate limits and
    /// transport hiccups are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_correctly() {
        let err = Error::Gateway(GatewayError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn session_not_found_displays_key() {
        let err = Error::Session(SessionError::NotFound("lab-42".into()));
        assert!(err.to_string().contains("lab-42"));
    }

    #[test]
    fn retryable_classification() {
        assert!(GatewayError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(GatewayError::Transport("connection reset".into()).is_retryable());
        assert!(!GatewayError::Timeout { elapsed_secs: 30 }.is_retryable());
        assert!(!GatewayError::MalformedReply("empty content".into()).is_retryable());
    }
}
