//!
//! Keeper: keep nested service configuration in sync with a flat key/value keeper.
//!
//! The keeper only stores flat, `/`-delimited keys with scalar values. This
//! library maps nested configuration onto that layout and back, and keeps a
//! live configuration value current as keys change.
//!
//! ## Core Concepts
//!
//! * **Codec (`codec`)**: Pure functions flattening a nested [`Value`] (or any
//!   `Serialize` type) into [`kv::KvPair`]s, and rebuilding a [`codec::Node`]
//!   tree from pairs that binds onto any `DeserializeOwned` target.
//! * **Transports (`transport::KeeperTransport`)**: The request/response seam
//!   to the keeper store. An HTTP transport speaks the keeper REST API; an
//!   in-memory transport backs tests and embedded use.
//! * **Message bus (`bus::MessageBus`)**: The publish/subscribe seam that
//!   delivers key change notifications.
//! * **Client (`client::KeeperClient`)**: Conditional writes, typed reads and
//!   change watches scoped to one base path.

pub mod bus;
pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod kv;
pub mod transport;
pub mod value;

/// Re-export the `Value` tree for easier access.
pub use value::Value;

pub use client::{ConfigurationClient, KeeperClient, NoopClient};
pub use config::ServiceConfig;

/// Result type used throughout the keeper library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the keeper library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured encode/decode errors from the codec module
    #[error(transparent)]
    Codec(codec::CodecError),

    /// Structured store errors from the transport module
    #[error(transparent)]
    Transport(transport::TransportError),

    /// Structured publish/subscribe errors from the bus module
    #[error(transparent)]
    Bus(bus::BusError),

    /// Structured client errors from the client module
    #[error(transparent)]
    Client(client::ClientError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Codec(_) => "codec",
            Error::Transport(_) => "transport",
            Error::Bus(_) => "bus",
            Error::Client(_) => "client",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a key or configuration was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Transport(transport_err) => transport_err.is_not_found(),
            Error::Client(client_err) => client_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a structural conflict in a decoded key set.
    pub fn is_structural_conflict(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_structural_conflict(),
            _ => false,
        }
    }

    /// Check if this error reports a value kind with no keeper representation.
    pub fn is_unsupported_kind(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_unsupported_kind(),
            _ => false,
        }
    }

    /// Check if this error is a failure to bind decoded data onto a target.
    pub fn is_binding_error(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_binding_error(),
            _ => false,
        }
    }

    /// Check if this error is codec-related.
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Error::Codec(_))
    }

    /// Check if this error came from the store transport, other than a missing key.
    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::Transport(transport_err) => !transport_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a failed subscription.
    pub fn is_subscription_error(&self) -> bool {
        match self {
            Error::Bus(bus_err) => bus_err.is_subscription_error(),
            _ => false,
        }
    }

    /// Check if this error is a merge write that stopped part way.
    pub fn is_partial_write(&self) -> bool {
        match self {
            Error::Client(client_err) => client_err.is_partial_write(),
            _ => false,
        }
    }
}
