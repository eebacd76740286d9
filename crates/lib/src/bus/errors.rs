//! Error types for the bus module.

use thiserror::Error;

/// Errors raised by a message bus.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BusError {
    /// Subscribing to a topic was refused or failed.
    #[error("Failed to subscribe to '{topic}': {reason}")]
    SubscribeFailed { topic: String, reason: String },

    /// The bus reported a failure while a subscription was live.
    #[error("Message bus error: {0}")]
    Transport(String),

    /// Disconnecting from the bus failed.
    #[error("Failed to disconnect from message bus: {0}")]
    DisconnectFailed(String),
}

impl BusError {
    /// Check if this error is a failed subscription.
    pub fn is_subscription_error(&self) -> bool {
        matches!(self, BusError::SubscribeFailed { .. })
    }
}

// Conversion from BusError to the main Error type
impl From<BusError> for crate::Error {
    fn from(err: BusError) -> Self {
        crate::Error::Bus(err)
    }
}
