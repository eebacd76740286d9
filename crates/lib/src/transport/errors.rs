//! Error types for the transport module.

use thiserror::Error;

/// Errors raised while talking to the keeper store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// No key exists at or below the requested path.
    #[error("No keys found under '{path}'")]
    NotFound { path: String },

    /// The keeper could not be reached.
    #[error("Failed to connect to {address}: {reason}")]
    Unreachable { address: String, reason: String },

    /// The keeper answered with a non-success status.
    #[error("Keeper returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The keeper answered with a body that could not be read.
    #[error("Invalid keeper response: {0}")]
    InvalidResponse(String),

    /// The configured service address is not a valid URL.
    #[error("Invalid keeper URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl TransportError {
    /// Check if this error indicates the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    /// Check if this error is a connectivity failure.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }

    /// Check if this error came from the keeper answering with an error.
    pub fn is_status_error(&self) -> bool {
        matches!(self, TransportError::Status { .. })
    }
}

// Conversion from TransportError to the main Error type
impl From<TransportError> for crate::Error {
    fn from(err: TransportError) -> Self {
        crate::Error::Transport(err)
    }
}
