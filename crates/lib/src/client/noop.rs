//! Client for deployments without a keeper.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;

use super::{ClientError, ConfigurationClient, WriteReport};
use crate::{Error, Result, Value, bus::MessageBus};

/// A [`ConfigurationClient`] that stores nothing.
///
/// Writes succeed without effect, existence checks report false and a watch
/// never starts. [`get_configuration`](ConfigurationClient::get_configuration)
/// fails with [`ClientError::ConfigurationNotFound`], as there is no
/// configuration to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

#[async_trait]
impl ConfigurationClient for NoopClient {
    async fn has_configuration(&self) -> Result<bool> {
        Ok(false)
    }

    async fn has_sub_configuration(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn put_configuration_map(
        &self,
        _configuration: &BTreeMap<String, Value>,
        _overwrite: bool,
    ) -> Result<WriteReport> {
        Ok(WriteReport::default())
    }

    async fn put_configuration<C>(&self, _configuration: &C, _overwrite: bool) -> Result<WriteReport>
    where
        C: Serialize + Sync + ?Sized,
    {
        Ok(WriteReport::default())
    }

    async fn get_configuration<C>(&self) -> Result<C>
    where
        C: DeserializeOwned + Send,
    {
        Err(ClientError::ConfigurationNotFound {
            base_path: String::new(),
        }
        .into())
    }

    fn watch_for_changes<C>(
        &self,
        _update_tx: mpsc::Sender<Option<C>>,
        _error_tx: mpsc::Sender<Error>,
        _initial: C,
        _wait_key: &str,
        _bus: Arc<dyn MessageBus>,
    ) where
        C: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
    }

    fn stop_watching(&self) {}

    async fn is_alive(&self) -> bool {
        false
    }

    async fn configuration_value_exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn get_configuration_value(&self, _name: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn get_configuration_value_by_full_path(&self, _key: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn put_configuration_value(&self, _name: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn get_configuration_keys(&self, _name: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
