//! Connection settings for a keeper service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{constants::DEFAULT_TOPIC_PREFIX, transport::TransportError};

/// Where the keeper lives and which part of it a client works on.
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// # use keeper::ServiceConfig;
/// let config: ServiceConfig = serde_json::from_str(r#"{"host": "keeper", "basePath": "edgex/core-data"}"#)?;
/// assert_eq!(config.port, 59890);
/// assert_eq!(config.url()?.as_str(), "http://keeper:59890/");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Key all configuration of this service lives under.
    pub base_path: String,
    /// Bus topic prefix the keeper publishes key changes under.
    pub topic_prefix: String,
    /// Request timeout for the HTTP transport.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 59890,
            base_path: String::new(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ServiceConfig {
    /// Config for `base_path` with all other settings at their defaults.
    pub fn for_base_path(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Base URL of the keeper service.
    pub fn url(&self) -> Result<Url, TransportError> {
        let raw = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
