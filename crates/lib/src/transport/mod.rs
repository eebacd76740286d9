//! Store transport abstractions.
//!
//! This module defines the request/response seam between the client and the
//! keeper store. The client only ever lists keys, reads subtrees, writes
//! values and pings, so any store exposing those four calls can back it.

use async_trait::async_trait;

use crate::{Result, Value, kv::KvPair};

pub mod dtos;
mod errors;
#[cfg(feature = "http")]
pub mod http;
pub mod in_memory;

pub use errors::TransportError;

/// Trait for talking to a keeper store.
///
/// Paths are full keys using `/` as the delimiter. Reads are recursive: a
/// path names a single key or the whole subtree below it.
#[async_trait]
pub trait KeeperTransport: Send + Sync {
    /// Get the transport type identifier (e.g. "http", "in-memory").
    fn transport_type(&self) -> &'static str;

    /// List every key at or below `path`.
    ///
    /// # Errors
    /// [`TransportError::NotFound`] when no key exists there.
    async fn keys(&self, path: &str) -> Result<Vec<String>>;

    /// Read every pair at or below `path`.
    ///
    /// # Errors
    /// [`TransportError::NotFound`] when no key exists there.
    async fn get(&self, path: &str) -> Result<Vec<KvPair>>;

    /// Write `value` at `path`.
    ///
    /// With `flatten` the store splits a nested value into one key per leaf
    /// below `path`, replacing those keys. Without it `value` must be a
    /// scalar and is stored at `path` itself.
    async fn put(&self, path: &str, value: &Value, flatten: bool) -> Result<()>;

    /// Check that the store answers.
    async fn ping(&self) -> Result<()>;
}
