//! Request and response bodies of the keeper REST API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Value, constants::API_VERSION, kv::KvRecord};

/// Fields every keeper response carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub status_code: u16,
}

/// Response to a subtree read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiKvResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    #[serde(default)]
    pub response: Vec<KvRecord>,
}

/// Response to a key-only subtree read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiKeyResponse {
    #[serde(flatten)]
    pub base: BaseResponse,
    #[serde(default)]
    pub response: Vec<String>,
}

/// Error body returned with non-success statuses.
pub type ErrorResponse = BaseResponse;

/// Body of a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeysRequest {
    pub api_version: String,
    pub request_id: String,
    pub value: Value,
}

impl AddKeysRequest {
    /// Wrap `value` with the current API version and a fresh request id.
    pub fn new(value: Value) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            request_id: Uuid::new_v4().to_string(),
            value,
        }
    }
}
