//! Centralized error types for the Agentic Twin core library.
//!
//! Nothing in the client is fatal: most of these errors are logged and
//! recovered locally (reconnect, fallback seed, failure notification). The
//! enum exists so the few places that *do* return an error (health check
//! giving up, invalid configuration) share one shape with stable codes.

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and exit reporting.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the twin client.
#[derive(Debug, Error)]
pub enum TwinError {
    /// WebSocket connect/read failure on the live feed.
    #[error("Feed transport error: {0}")]
    Transport(String),

    /// A frame or payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP request to the backend failed (network or status).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Health check exhausted its attempts without a healthy answer.
    #[error("Backend unavailable after {attempts} health check attempt(s)")]
    BackendUnavailable {
        /// Number of checks that were sent.
        attempts: u32,
    },

    /// Scenario bootstrap payload was unusable.
    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl ErrorCode for TwinError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "feed_transport_error",
            Self::Decode(_) => "decode_error",
            Self::Http(_) => "http_request_failed",
            Self::Configuration(_) => "configuration_error",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Scenario(_) => "scenario_error",
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type TwinResult<T> = Result<T, TwinError>;

impl From<tokio_tungstenite::tungstenite::Error> for TwinError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for TwinError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for TwinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
