//! Transcoding between nested values and flat key/value pairs.
//!
//! The write direction flattens a [`Value`](crate::Value) (or anything
//! serializable) into path-keyed pairs. The read direction rebuilds a
//! [`Node`] tree from pairs and binds it onto a serde target:
//!
//! ```rust
//! use keeper::{codec, kv::KvPair};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! #[serde(rename_all = "PascalCase")]
//! struct Writable {
//!     log_level: String,
//!     persist_data: bool,
//! }
//!
//! let pairs = vec![
//!     KvPair::new("svc/Writable/LogLevel", "INFO"),
//!     KvPair::new("svc/Writable/PersistData", "true"),
//! ];
//! let writable: Writable = codec::decode("svc/Writable", &pairs)?;
//! assert_eq!(writable, Writable { log_level: "INFO".into(), persist_data: true });
//! # Ok::<(), keeper::codec::CodecError>(())
//! ```
//!
//! Enumeration order of flattened pairs is not significant. Compare them as
//! sets.

mod de;
mod errors;
mod flatten;
pub(crate) mod ser;
mod tree;

use serde::{Serialize, de::DeserializeOwned};

pub use errors::CodecError;
pub use flatten::{flatten, flatten_serialize, flatten_typed};
pub use tree::Node;

use crate::{Value, kv::KvPair};

/// Decodes `pairs` below `prefix` into a fresh `T`.
///
/// # Errors
/// - [`CodecError::StructuralConflict`] if a key is both a value and a directory
/// - [`CodecError::Binding`] if the tree does not fit `T`
pub fn decode<T: DeserializeOwned>(prefix: &str, pairs: &[KvPair]) -> Result<T, CodecError> {
    Node::from_pairs(prefix, pairs)?.bind()
}

/// Decodes `pairs` below `prefix` into the dynamic [`Value`] tree.
///
/// Branches whose children are exactly `0..n` come back as lists, all other
/// branches as maps. Empty containers come back as empty maps.
pub fn decode_value(prefix: &str, pairs: &[KvPair]) -> Result<Value, CodecError> {
    decode(prefix, pairs)
}

/// Decodes `pairs` below `prefix` over the current contents of `target`.
///
/// Only paths present in `pairs` change; every other field keeps its value.
/// `target` is left untouched when decoding fails.
pub fn decode_into<T>(prefix: &str, pairs: &[KvPair], target: &mut T) -> Result<(), CodecError>
where
    T: Serialize + DeserializeOwned,
{
    let incoming = Node::from_pairs(prefix, pairs)?;
    let mut tree = Node::from_serialize(target)?;
    tree.overlay(incoming);
    *target = tree.bind()?;
    Ok(())
}
