//! Key path helpers.
//!
//! Keys are strings of segments joined by [`KEY_DELIMITER`]. These helpers
//! join, normalize and split them without allocating a dedicated path type;
//! the keeper only ever exchanges plain strings.
//!
//! ```rust
//! use keeper::kv::path;
//!
//! assert_eq!(path::join("svc", "Writable/LogLevel"), "svc/Writable/LogLevel");
//! assert_eq!(path::normalize("/svc//Writable/"), "svc/Writable");
//! assert_eq!(path::relative_to("svc", "svc/Writable"), Some("Writable"));
//! assert_eq!(path::relative_to("svc", "svcx/Writable"), None);
//! ```

use crate::{
    codec::CodecError,
    constants::{KEY_DELIMITER, KEY_DELIMITER_CHAR},
};

/// Normalizes a key by dropping empty segments.
///
/// - Empty string "" → empty string (refers to the root)
/// - Leading delimiters "/svc" → "svc"
/// - Trailing delimiters "svc/" → "svc"
/// - Consecutive delimiters "svc//Writable" → "svc/Writable"
pub fn normalize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    input
        .split(KEY_DELIMITER_CHAR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// Joins two key fragments, normalizing the result.
pub fn join(prefix: &str, rest: &str) -> String {
    join_all([prefix, rest])
}

/// Joins any number of key fragments, normalizing the result.
pub fn join_all<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(|part| part.split(KEY_DELIMITER_CHAR))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// Returns `key` relative to `prefix`, matching whole segments only.
///
/// `Some("")` means `key` is `prefix` itself. `None` means `key` lies outside
/// of `prefix`. An empty prefix contains every key.
pub fn relative_to<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches(KEY_DELIMITER_CHAR);
    if prefix.is_empty() {
        return Some(key.trim_start_matches(KEY_DELIMITER_CHAR));
    }

    let rest = key.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(KEY_DELIMITER_CHAR)
    }
}

/// Returns true if `key` is `prefix` or lies below it.
pub fn is_within(prefix: &str, key: &str) -> bool {
    relative_to(prefix, key).is_some()
}

/// Returns true for characters the keeper accepts in key names.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~' | ';' | '=' | '.' | '/')
}

/// Checks that `key` is non-empty and only uses allowed characters.
pub fn validate_key(key: &str) -> Result<(), CodecError> {
    if key.is_empty() {
        return Err(CodecError::InvalidKey {
            key: key.to_string(),
            reason: "key cannot be empty".to_string(),
        });
    }

    match key.chars().find(|c| !is_allowed_char(*c)) {
        Some(c) => Err(CodecError::InvalidKey {
            key: key.to_string(),
            reason: format!("character '{c}' is not allowed"),
        }),
        None => Ok(()),
    }
}
