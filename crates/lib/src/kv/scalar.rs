//! Scalar values stored at a single key.

use std::fmt;

use crate::codec::CodecError;

/// A scalar stored at a single keeper key.
///
/// Keeper values are always leaves: nested structures only exist as key paths.
/// Values that arrive from the wire as JSON arrays or objects have no scalar
/// form and are rejected with [`CodecError::UnsupportedValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Absent value, rendered as the empty string
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
}

impl Scalar {
    /// Returns the kind name as a string
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
        }
    }

    /// Renders the value as canonical text.
    ///
    /// Integers are base-10, booleans are `true`/`false` and an absent value
    /// is the empty string. Floats use the shortest digits that parse back to
    /// the same value, switching to exponent form (`1e+300`, `1e-05`) when
    /// the decimal exponent is below -4 or at least 6. Non-finite floats
    /// render as `NaN`, `+Inf` and `-Inf`.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => render_float(*f),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// Returns true for [`Scalar::Null`] and the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Attempts to convert to a string slice
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to the JSON form used on the wire.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(n) => serde_json::Value::from(*n),
            // Non-finite floats have no JSON form
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(render_float(*f))),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Converts a JSON value found at `key` into a scalar.
    pub fn from_json(key: &str, value: serde_json::Value) -> Result<Self, CodecError> {
        match value {
            serde_json::Value::Null => Ok(Scalar::Null),
            serde_json::Value::Bool(b) => Ok(Scalar::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else if n.is_u64() {
                    Err(CodecError::UnsupportedValueKind {
                        path: key.to_string(),
                        kind: format!("unsigned integer {n} out of range"),
                    })
                } else {
                    n.as_f64()
                        .map(Scalar::Float)
                        .ok_or_else(|| CodecError::UnsupportedValueKind {
                            path: key.to_string(),
                            kind: format!("number {n}"),
                        })
                }
            }
            serde_json::Value::String(s) => Ok(Scalar::Text(s)),
            serde_json::Value::Array(_) => Err(CodecError::UnsupportedValueKind {
                path: key.to_string(),
                kind: "array".to_string(),
            }),
            serde_json::Value::Object(_) => Err(CodecError::UnsupportedValueKind {
                path: key.to_string(),
                kind: "object".to_string(),
            }),
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = format!("{f:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    match exponent.parse::<i32>() {
        Ok(exp) if !(-4..6).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        _ => f.to_string(),
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}
