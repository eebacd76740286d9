//! Error types for codec operations.
//!
//! This module defines the failures that can occur while flattening values
//! into key/value pairs, rebuilding the hierarchical tree from pairs, and
//! binding that tree onto a target type.

use std::fmt::Display;

use thiserror::Error;

/// Structured error types for codec operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodecError {
    /// A key path is used both as a value and as a directory
    #[error("Structural conflict at '{path}': a key cannot be both a value and a directory")]
    StructuralConflict { path: String },

    /// A value has no keeper representation
    #[error("Unsupported value kind at '{path}': {kind}")]
    UnsupportedValueKind { path: String, kind: String },

    /// The decoded tree could not be mapped onto the target type
    #[error("Failed to bind configuration at '{}': {reason}", display_path(.path))]
    Binding { path: String, reason: String },

    /// A key contains characters the keeper does not accept
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl CodecError {
    /// Check if this error is a leaf/directory conflict
    pub fn is_structural_conflict(&self) -> bool {
        matches!(self, CodecError::StructuralConflict { .. })
    }

    /// Check if this error is an unsupported value kind
    pub fn is_unsupported_kind(&self) -> bool {
        matches!(self, CodecError::UnsupportedValueKind { .. })
    }

    /// Check if this error happened while binding onto a target type
    pub fn is_binding_error(&self) -> bool {
        matches!(self, CodecError::Binding { .. })
    }

    /// Check if this error is a rejected key
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, CodecError::InvalidKey { .. })
    }

    /// Get the path if this is a path-related error
    pub fn path(&self) -> Option<&str> {
        match self {
            CodecError::StructuralConflict { path }
            | CodecError::UnsupportedValueKind { path, .. }
            | CodecError::Binding { path, .. } => Some(path),
            CodecError::InvalidKey { key, .. } => Some(key),
        }
    }

    /// Attach `path` to a binding or value-kind error that has no location yet.
    pub(crate) fn with_path(self, path: &str) -> Self {
        match self {
            CodecError::Binding { path: at, reason } if at.is_empty() => CodecError::Binding {
                path: path.to_string(),
                reason,
            },
            CodecError::UnsupportedValueKind { path: at, kind } if at.is_empty() => {
                CodecError::UnsupportedValueKind {
                    path: path.to_string(),
                    kind,
                }
            }
            other => other,
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

impl serde::de::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::Binding {
            path: String::new(),
            reason: msg.to_string(),
        }
    }
}

impl serde::ser::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        CodecError::UnsupportedValueKind {
            path: String::new(),
            kind: msg.to_string(),
        }
    }
}

// Conversion from CodecError to the main Error type
impl From<CodecError> for crate::Error {
    fn from(err: CodecError) -> Self {
        crate::Error::Codec(err)
    }
}
