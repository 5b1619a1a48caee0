//! Error types for kdash tables.

use thiserror::Error;

/// Fetch errors - reported to the notification collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection-level failure (DNS, refused, reset, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Request failed with status {code}: {message}")]
    Status { code: u16, message: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Check if the endpoint rejected the request (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, FetchError::Status { code, .. } if (400..500).contains(code))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}
