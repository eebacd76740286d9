//! Error types for the client module.

use thiserror::Error;

/// Errors raised by configuration client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// No configuration is stored under the base path.
    #[error("The keeper holds no configuration under '{base_path}'")]
    ConfigurationNotFound { base_path: String },

    /// No value is stored at the requested path.
    #[error("Configuration value '{path}' not found")]
    ValueNotFound { path: String },

    /// A merge write failed after some keys were already written.
    ///
    /// Keys in `written` stay in the keeper; nothing is rolled back.
    #[error("Failed to write '{key}' after writing {} key(s): {source}", .written.len())]
    PartialWrite {
        key: String,
        written: Vec<String>,
        #[source]
        source: Box<crate::Error>,
    },
}

impl ClientError {
    /// Check if this error indicates missing configuration or a missing value.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClientError::ConfigurationNotFound { .. } | ClientError::ValueNotFound { .. }
        )
    }

    /// Check if this error is a merge write that stopped part way.
    pub fn is_partial_write(&self) -> bool {
        matches!(self, ClientError::PartialWrite { .. })
    }

    /// Keys written before a merge write failed.
    pub fn written_keys(&self) -> &[String] {
        match self {
            ClientError::PartialWrite { written, .. } => written,
            _ => &[],
        }
    }
}

// Conversion from ClientError to the main Error type
impl From<ClientError> for crate::Error {
    fn from(err: ClientError) -> Self {
        crate::Error::Client(err)
    }
}
