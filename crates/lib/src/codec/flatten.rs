//! Flattening of nested values into key/value pairs.

use serde::Serialize;

use crate::{
    Value,
    codec::CodecError,
    constants::PLACEHOLDER,
    kv::{KvPair, Scalar, path},
};

/// Flattens `value` below `prefix` into pairs with text-rendered values.
///
/// Sequences use decimal indices as segments, maps use their keys. An empty
/// sequence or map becomes a single `{prefix}/Placeholder` pair holding the
/// empty string so the container is still visible in the flat form.
///
/// The set of returned pairs is deterministic; their order is not part of the
/// contract.
///
/// ```
/// # use keeper::{Value, codec::flatten, kv::{KvPair, Scalar}};
/// let value = Value::map([("Writable", Value::map([("LogLevel", Value::from("INFO"))]))]);
/// assert_eq!(
///     flatten("svc", &value),
///     vec![KvPair::new("svc/Writable/LogLevel", "INFO")]
/// );
/// ```
pub fn flatten(prefix: &str, value: &Value) -> Vec<KvPair> {
    let mut pairs = flatten_typed(prefix, value);
    for pair in &mut pairs {
        if !matches!(pair.value, Scalar::Text(_)) {
            pair.value = Scalar::Text(pair.value.render());
        }
    }
    pairs
}

/// Flattens `value` below `prefix`, keeping each scalar's kind.
///
/// This is the decomposition a keeper performs when asked to store a nested
/// value with flattening enabled.
pub fn flatten_typed(prefix: &str, value: &Value) -> Vec<KvPair> {
    let mut pairs = Vec::new();
    walk(&path::normalize(prefix), value, &mut pairs);
    pairs
}

/// Serializes `value` and flattens it below `prefix`.
pub fn flatten_serialize<T: Serialize + ?Sized>(
    prefix: &str,
    value: &T,
) -> Result<Vec<KvPair>, CodecError> {
    Ok(flatten(prefix, &Value::from_serialize(value)?))
}

fn walk(key: &str, value: &Value, pairs: &mut Vec<KvPair>) {
    match value {
        Value::List(items) if items.is_empty() => placeholder(key, pairs),
        Value::Map(entries) if entries.is_empty() => placeholder(key, pairs),
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(&path::join(key, &index.to_string()), item, pairs);
            }
        }
        Value::Map(entries) => {
            for (name, child) in entries {
                walk(&path::join(key, name), child, pairs);
            }
        }
        Value::Null => pairs.push(KvPair::new(key, Scalar::Null)),
        Value::Bool(b) => pairs.push(KvPair::new(key, *b)),
        Value::Int(n) => pairs.push(KvPair::new(key, *n)),
        Value::Float(f) => pairs.push(KvPair::new(key, *f)),
        Value::Text(s) => pairs.push(KvPair::new(key, s.as_str())),
    }
}

fn placeholder(key: &str, pairs: &mut Vec<KvPair>) {
    pairs.push(KvPair::new(path::join(key, PLACEHOLDER), ""));
}
