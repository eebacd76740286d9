//! Flat key/value primitives.
//!
//! The keeper stores configuration as flat pairs whose keys are
//! delimiter-joined paths (`service/Writable/LogLevel`) and whose values are
//! scalars. This module provides the in-memory form of those pairs
//! ([`KvPair`], [`Scalar`]), their wire form ([`KvRecord`]) and helpers for
//! working with key paths ([`path`]).

pub mod path;
mod record;
mod scalar;

pub use record::KvRecord;
pub use scalar::Scalar;

/// A single flat configuration entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KvPair {
    /// Full delimiter-joined key.
    pub key: String,
    /// Scalar value stored at the key.
    pub value: Scalar,
}

impl KvPair {
    /// Create a new pair.
    pub fn new(key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the value rendered as canonical text.
    pub fn rendered(&self) -> String {
        self.value.render()
    }
}
