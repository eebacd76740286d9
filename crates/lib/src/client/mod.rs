//! Configuration clients.
//!
//! [`ConfigurationClient`] is the surface services use to seed, read and watch
//! their configuration. [`KeeperClient`] implements it against a keeper store
//! reached through any [`KeeperTransport`]; [`NoopClient`] implements it for
//! deployments without a keeper.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    Error, Result, ServiceConfig, Value,
    bus::MessageBus,
    codec::{CodecError, decode, flatten},
    constants::TOPIC_WILDCARD,
    kv::path,
    transport::KeeperTransport,
};

mod errors;
mod noop;
mod watch;
pub mod writer;

pub use errors::ClientError;
pub use noop::NoopClient;
pub use writer::{ConditionalWriter, WriteReport};

use watch::ChangeReconciler;

/// Operations a service performs on its configuration.
///
/// Names passed to the `*_value`, `*_keys` and `has_sub_configuration`
/// methods are relative to the client's base path.
#[async_trait]
pub trait ConfigurationClient: Send + Sync {
    /// Check whether any key exists under the base path.
    async fn has_configuration(&self) -> Result<bool>;

    /// Check whether any key exists under `name`.
    async fn has_sub_configuration(&self, name: &str) -> Result<bool>;

    /// Write each entry of `configuration` below the base path, one key per leaf.
    ///
    /// Without `overwrite` keys that already exist are left alone.
    async fn put_configuration_map(
        &self,
        configuration: &BTreeMap<String, Value>,
        overwrite: bool,
    ) -> Result<WriteReport>;

    /// Write a whole configuration below the base path, see [`ConditionalWriter`].
    async fn put_configuration<C>(&self, configuration: &C, overwrite: bool) -> Result<WriteReport>
    where
        C: Serialize + Sync + ?Sized;

    /// Read and decode the whole configuration under the base path.
    ///
    /// # Errors
    /// [`ClientError::ConfigurationNotFound`] when no key exists there.
    async fn get_configuration<C>(&self) -> Result<C>
    where
        C: DeserializeOwned + Send;

    /// Start watching `wait_key` below the base path for changes.
    ///
    /// Runs as a background task, so it must be called inside a tokio
    /// runtime. Once subscribed, the task sends `None` on `update_tx` as a
    /// handshake, then the updated configuration after every accepted change.
    /// Subscription failures are sent on `error_tx` and end the watch.
    fn watch_for_changes<C>(
        &self,
        update_tx: mpsc::Sender<Option<C>>,
        error_tx: mpsc::Sender<Error>,
        initial: C,
        wait_key: &str,
        bus: Arc<dyn MessageBus>,
    ) where
        C: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Stop every watch started by this client. Never blocks.
    fn stop_watching(&self);

    /// Check whether the keeper answers.
    async fn is_alive(&self) -> bool;

    /// Check whether any key exists at or below `name`.
    async fn configuration_value_exists(&self, name: &str) -> Result<bool>;

    /// Read the value stored at `name`, rendered as text.
    async fn get_configuration_value(&self, name: &str) -> Result<Vec<u8>>;

    /// Read the value stored at the full key `key`, rendered as text.
    async fn get_configuration_value_by_full_path(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `value` as text at `name`.
    async fn put_configuration_value(&self, name: &str, value: &[u8]) -> Result<()>;

    /// List every key at or below `name`.
    async fn get_configuration_keys(&self, name: &str) -> Result<Vec<String>>;
}

/// Configuration client backed by a keeper store.
pub struct KeeperClient {
    config: ServiceConfig,
    transport: Arc<dyn KeeperTransport>,
    /// Done signals of running watches
    watchers: Mutex<Vec<mpsc::Sender<()>>>,
}

impl std::fmt::Debug for KeeperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeperClient")
            .field("base_path", &self.config.base_path)
            .field("transport", &self.transport.transport_type())
            .finish()
    }
}

impl KeeperClient {
    /// Create a client talking to the keeper REST API described by `config`.
    #[cfg(feature = "http")]
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let transport = crate::transport::http::HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an existing transport.
    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn KeeperTransport>) -> Self {
        Self {
            config,
            transport,
            watchers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    pub fn transport(&self) -> &Arc<dyn KeeperTransport> {
        &self.transport
    }

    /// Number of watches that have not finished yet.
    pub fn watch_count(&self) -> usize {
        let mut watchers = self.watchers.lock().unwrap();
        watchers.retain(|done| !done.is_closed());
        watchers.len()
    }

    fn full_path(&self, name: &str) -> String {
        path::join(&self.config.base_path, name)
    }

    /// Check whether any key exists at or below the full key `key`.
    async fn exists(&self, key: &str) -> Result<bool> {
        match self.transport.keys(key).await {
            Ok(keys) => Ok(!keys.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ConfigurationClient for KeeperClient {
    async fn has_configuration(&self) -> Result<bool> {
        self.exists(self.base_path()).await
    }

    async fn has_sub_configuration(&self, name: &str) -> Result<bool> {
        self.exists(&self.full_path(name)).await
    }

    async fn put_configuration_map(
        &self,
        configuration: &BTreeMap<String, Value>,
        overwrite: bool,
    ) -> Result<WriteReport> {
        let mut pairs = Vec::new();
        for (name, value) in configuration {
            pairs.extend(flatten(&self.full_path(name), value));
        }
        for pair in &pairs {
            path::validate_key(&pair.key)?;
        }
        ConditionalWriter::new(self.transport.as_ref())
            .write_pairs(pairs, overwrite)
            .await
    }

    async fn put_configuration<C>(&self, configuration: &C, overwrite: bool) -> Result<WriteReport>
    where
        C: Serialize + Sync + ?Sized,
    {
        let value = Value::from_serialize(configuration)?;
        ConditionalWriter::new(self.transport.as_ref())
            .write(self.base_path(), &value, overwrite)
            .await
    }

    async fn get_configuration<C>(&self) -> Result<C>
    where
        C: DeserializeOwned + Send,
    {
        let not_found = || ClientError::ConfigurationNotFound {
            base_path: self.config.base_path.clone(),
        };
        if !self.has_configuration().await? {
            return Err(not_found().into());
        }
        let pairs = match self.transport.get(self.base_path()).await {
            Ok(pairs) => pairs,
            Err(e) if e.is_not_found() => return Err(not_found().into()),
            Err(e) => return Err(e),
        };
        debug!(base_path = %self.config.base_path, keys = pairs.len(), "decoding configuration");
        Ok(decode(self.base_path(), &pairs)?)
    }

    fn watch_for_changes<C>(
        &self,
        update_tx: mpsc::Sender<Option<C>>,
        error_tx: mpsc::Sender<Error>,
        initial: C,
        wait_key: &str,
        bus: Arc<dyn MessageBus>,
    ) where
        C: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let topic = path::join_all([
            self.config.topic_prefix.as_str(),
            self.base_path(),
            wait_key,
            TOPIC_WILDCARD,
        ]);
        let key_prefix = self.full_path(wait_key);

        let (done_tx, done_rx) = mpsc::channel(1);
        {
            let mut watchers = self.watchers.lock().unwrap();
            // Finished watches drop their receiver.
            watchers.retain(|done| !done.is_closed());
            watchers.push(done_tx);
        }

        info!(%topic, "starting configuration watch");
        let reconciler = ChangeReconciler::new(
            Arc::clone(&self.transport),
            key_prefix,
            initial,
            update_tx,
            error_tx,
            done_rx,
        );
        tokio::spawn(reconciler.run(bus, topic));
    }

    fn stop_watching(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock().unwrap());
        for done in watchers {
            // A full slot already carries a stop; a closed one has finished.
            let _ = done.try_send(());
        }
    }

    async fn is_alive(&self) -> bool {
        self.transport.ping().await.is_ok()
    }

    async fn configuration_value_exists(&self, name: &str) -> Result<bool> {
        self.exists(&self.full_path(name)).await
    }

    async fn get_configuration_value(&self, name: &str) -> Result<Vec<u8>> {
        self.get_configuration_value_by_full_path(&self.full_path(name))
            .await
    }

    async fn get_configuration_value_by_full_path(&self, key: &str) -> Result<Vec<u8>> {
        let not_found = || ClientError::ValueNotFound {
            path: key.to_string(),
        };
        let pairs = match self.transport.get(key).await {
            Ok(pairs) => pairs,
            Err(e) if e.is_not_found() => return Err(not_found().into()),
            Err(e) => return Err(e),
        };
        // The keeper answers with the whole subtree; prefer the exact key.
        let pair = pairs
            .iter()
            .find(|pair| pair.key == key)
            .or_else(|| pairs.first())
            .ok_or_else(not_found)?;
        Ok(pair.rendered().into_bytes())
    }

    async fn put_configuration_value(&self, name: &str, value: &[u8]) -> Result<()> {
        let key = self.full_path(name);
        path::validate_key(&key)?;
        let text = std::str::from_utf8(value).map_err(|e| CodecError::UnsupportedValueKind {
            path: key.clone(),
            kind: format!("bytes that are not UTF-8 text ({e})"),
        })?;
        self.transport
            .put(&key, &Value::Text(text.to_string()), false)
            .await
    }

    async fn get_configuration_keys(&self, name: &str) -> Result<Vec<String>> {
        self.transport.keys(&self.full_path(name)).await
    }
}
