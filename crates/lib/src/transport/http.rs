//! HTTP transport for the keeper REST API.
//!
//! Speaks the `/api/v3` JSON endpoints with reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::trace;
use url::Url;

use super::{
    KeeperTransport, TransportError,
    dtos::{AddKeysRequest, ErrorResponse, MultiKeyResponse, MultiKvResponse},
};
use crate::{
    Result, ServiceConfig, Value,
    constants::{API_KV_ROUTE, API_PING_ROUTE, KEY_DELIMITER_CHAR, QUERY_FLATTEN, QUERY_KEY_ONLY},
    kv::KvPair,
};

/// HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the keeper described by `config`.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Self::with_base_url(config.url()?, config.timeout())
    }

    /// Create a transport for the keeper at `base_url`.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable {
                address: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL of `route`, followed by the segments of `path`.
    fn url(&self, route: &str, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| TransportError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base URL".to_string(),
            })?;
            segments
                .clear()
                .extend(route.split(KEY_DELIMITER_CHAR).filter(|s| !s.is_empty()))
                .extend(path.split(KEY_DELIMITER_CHAR).filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// Send `request`, mapping failures and error statuses.
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| TransportError::Unreachable {
            address: self.base_url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("Failed to parse response: {e}")).into())
    }
}

#[async_trait]
impl KeeperTransport for HttpTransport {
    fn transport_type(&self) -> &'static str {
        "http"
    }

    async fn keys(&self, path: &str) -> Result<Vec<String>> {
        let mut url = self.url(API_KV_ROUTE, path)?;
        url.query_pairs_mut().append_pair(QUERY_KEY_ONLY, "true");
        trace!(%url, "listing keys");

        let response = self.send(self.client.get(url), path).await?;
        let body: MultiKeyResponse = Self::read_json(response).await?;
        if body.response.is_empty() {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        Ok(body.response)
    }

    async fn get(&self, path: &str) -> Result<Vec<KvPair>> {
        let url = self.url(API_KV_ROUTE, path)?;
        trace!(%url, "reading subtree");

        let response = self.send(self.client.get(url), path).await?;
        let body: MultiKvResponse = Self::read_json(response).await?;
        if body.response.is_empty() {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        let pairs = body
            .response
            .into_iter()
            .map(KvPair::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    async fn put(&self, path: &str, value: &Value, flatten: bool) -> Result<()> {
        let mut url = self.url(API_KV_ROUTE, path)?;
        url.query_pairs_mut()
            .append_pair(QUERY_FLATTEN, if flatten { "true" } else { "false" });
        trace!(%url, flatten, "writing value");

        let request = self.client.put(url).json(&AddKeysRequest::new(value.clone()));
        self.send(request, path).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let url = self.url(API_PING_ROUTE, "")?;
        trace!(%url, "pinging keeper");
        self.send(self.client.get(url), "").await?;
        Ok(())
    }
}
