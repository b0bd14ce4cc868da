//! Common error types for pirkit.

use thiserror::Error;

/// Top-level error type for pirkit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed (credential, token or config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token exchange or refresh failed, or the token is unusable.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Transport failure or unexpected API response.
    #[error("Network error: {0}")]
    Network(String),

    /// The API refused access to the resource.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one resource matched where exactly one was expected.
    #[error("Ambiguous: {0}")]
    Ambiguous(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
