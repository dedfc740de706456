//! Common error types for vidrelay.

use thiserror::Error;

use crate::types::ProviderId;

/// Top-level error type for vidrelay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Request input is malformed or violates a limit.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Provider identifier outside the supported set.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// No credential stored for this (user, provider) pair.
    #[error("{} API key not configured", .0.display_name())]
    CredentialMissing(ProviderId),

    /// Stored credential does not have the shape the provider needs.
    #[error("{0}")]
    MalformedCredential(String),

    /// Non-2xx response, timeout, connection failure, or a body that was not
    /// the JSON we expected.
    #[error("{0}")]
    UpstreamTransport(String),

    /// The provider answered with well-formed JSON but reported failure.
    #[error("{0}")]
    UpstreamLogical(String),

    /// The provider has no equivalent for this operation.
    #[error("{0}")]
    Unsupported(String),

    /// Record store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::UpstreamTransport(_))
    }

    /// Whether this is a structural capability gap rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }

    /// Whether the caller sent something we refuse before touching a provider.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UnknownProvider(_) | Error::MalformedCredential(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
