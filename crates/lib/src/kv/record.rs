//! Wire form of a stored key/value pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{KvPair, Scalar};
use crate::codec::CodecError;

/// A key/value pair as the keeper sends it, with storage timestamps.
///
/// Used both in subtree responses and as the payload of change notifications.
/// The value is kept as raw JSON until [`KvRecord::into_pair`] checks that it
/// is a scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Creation time in milliseconds since the epoch
    #[serde(default, skip_serializing_if = "is_zero")]
    pub created: i64,
    /// Last modification time in milliseconds since the epoch
    #[serde(default, skip_serializing_if = "is_zero")]
    pub modified: i64,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl KvRecord {
    /// Build a record for `pair` stamped with the given times.
    pub fn from_pair(pair: &KvPair, created: i64, modified: i64) -> Self {
        Self {
            key: pair.key.clone(),
            value: pair.value.to_json(),
            created,
            modified,
        }
    }

    /// Creation time, if the keeper reported one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        (self.created != 0)
            .then(|| DateTime::from_timestamp_millis(self.created))
            .flatten()
    }

    /// Modification time, if the keeper reported one.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        (self.modified != 0)
            .then(|| DateTime::from_timestamp_millis(self.modified))
            .flatten()
    }

    /// Convert into a [`KvPair`], rejecting non-scalar values.
    pub fn into_pair(self) -> Result<KvPair, CodecError> {
        let value = Scalar::from_json(&self.key, self.value)?;
        Ok(KvPair {
            key: self.key,
            value,
        })
    }
}

impl TryFrom<KvRecord> for KvPair {
    type Error = CodecError;

    fn try_from(record: KvRecord) -> Result<Self, Self::Error> {
        record.into_pair()
    }
}
