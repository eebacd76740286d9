//! Constants used throughout the keeper library.
//!
//! This module provides central definitions for the key layout, the keeper
//! REST routes and the message bus conventions shared by the client, the
//! transports and the watch loop.

/// Separator between the segments of a flat key.
pub const KEY_DELIMITER: &str = "/";

/// Character form of [`KEY_DELIMITER`].
pub const KEY_DELIMITER_CHAR: char = '/';

/// Leaf name written for empty mappings and sequences so they survive flattening.
pub const PLACEHOLDER: &str = "Placeholder";

/// Default topic prefix under which the keeper publishes key changes.
pub const DEFAULT_TOPIC_PREFIX: &str = "keeper/configs";

/// Multi-level wildcard segment for topic subscriptions.
pub const TOPIC_WILDCARD: &str = "#";

/// Single-level wildcard segment for topic subscriptions.
pub const TOPIC_SINGLE_WILDCARD: &str = "+";

/// Content type of change notifications and request bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// API version reported in request DTOs.
pub const API_VERSION: &str = "v3";

/// Root of the keeper REST API.
pub const API_BASE: &str = "/api/v3";

/// Liveness probe route.
pub const API_PING_ROUTE: &str = "/api/v3/ping";

/// Key/value route; the key path is appended after a delimiter.
pub const API_KV_ROUTE: &str = "/api/v3/kv/key";

/// Query parameter asking the keeper to return key names only.
pub const QUERY_KEY_ONLY: &str = "keyOnly";

/// Query parameter asking the keeper to flatten a nested request value.
pub const QUERY_FLATTEN: &str = "flatten";
