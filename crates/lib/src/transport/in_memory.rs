//! In-memory keeper store.
//!
//! Keeps keys in a sorted map and optionally publishes every write on an
//! [`InMemoryBus`] the way a keeper service does, which makes it a complete
//! stand-in for tests and embedded use.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{trace, warn};

use super::{KeeperTransport, TransportError};
use crate::{
    Result, Value,
    bus::{MessageEnvelope, in_memory::InMemoryBus},
    codec::{CodecError, flatten_typed},
    kv::{KvPair, KvRecord, Scalar, path},
};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Scalar,
    created: i64,
    modified: i64,
}

#[derive(Debug, Clone)]
struct Notifier {
    bus: InMemoryBus,
    topic_prefix: String,
}

#[derive(Debug)]
struct StoreInner {
    entries: RwLock<BTreeMap<String, StoredValue>>,
    notifier: RwLock<Option<Notifier>>,
    alive: AtomicBool,
}

/// A keeper store held in process memory.
///
/// Clones share the same store.
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    inner: Arc<StoreInner>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(BTreeMap::new()),
                notifier: RwLock::new(None),
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// Publish every write on `bus` below `topic_prefix`.
    pub fn with_notifications(self, bus: InMemoryBus, topic_prefix: impl Into<String>) -> Self {
        *self.inner.notifier.write().unwrap() = Some(Notifier {
            bus,
            topic_prefix: topic_prefix.into(),
        });
        self
    }

    /// Make [`KeeperTransport::ping`] fail, or succeed again.
    pub fn set_alive(&self, alive: bool) {
        self.inner.alive.store(alive, Ordering::SeqCst);
    }

    /// Insert pairs directly, without validation or notifications.
    pub fn seed(&self, pairs: impl IntoIterator<Item = KvPair>) {
        let now = Utc::now().timestamp_millis();
        let mut entries = self.inner.entries.write().unwrap();
        for pair in pairs {
            entries.insert(
                pair.key,
                StoredValue {
                    value: pair.value,
                    created: now,
                    modified: now,
                },
            );
        }
    }

    /// Current value at exactly `key`.
    pub fn value(&self, key: &str) -> Option<Scalar> {
        let entries = self.inner.entries.read().unwrap();
        entries.get(key).map(|stored| stored.value.clone())
    }

    /// Every stored pair, ordered by key.
    pub fn pairs(&self) -> Vec<KvPair> {
        let entries = self.inner.entries.read().unwrap();
        entries
            .iter()
            .map(|(key, stored)| KvPair::new(key.clone(), stored.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `pairs`, returning the records to announce.
    fn store(&self, pairs: Vec<KvPair>) -> Vec<KvRecord> {
        let now = Utc::now().timestamp_millis();
        let mut entries = self.inner.entries.write().unwrap();
        pairs
            .into_iter()
            .map(|pair| {
                let created = entries.get(&pair.key).map_or(now, |stored| stored.created);
                entries.insert(
                    pair.key.clone(),
                    StoredValue {
                        value: pair.value.clone(),
                        created,
                        modified: now,
                    },
                );
                KvRecord::from_pair(&pair, created, now)
            })
            .collect()
    }

    async fn announce(&self, records: Vec<KvRecord>) {
        let notifier = self.inner.notifier.read().unwrap().clone();
        let Some(notifier) = notifier else {
            return;
        };
        for record in records {
            let topic = path::join(&notifier.topic_prefix, &record.key);
            match MessageEnvelope::json(topic, &record) {
                Ok(envelope) => {
                    notifier.bus.publish(envelope).await;
                }
                Err(e) => warn!(key = %record.key, error = %e, "failed to encode change notification"),
            }
        }
    }
}

#[async_trait]
impl KeeperTransport for InMemoryTransport {
    fn transport_type(&self) -> &'static str {
        "in-memory"
    }

    async fn keys(&self, path: &str) -> Result<Vec<String>> {
        let entries = self.inner.entries.read().unwrap();
        let keys: Vec<String> = entries
            .keys()
            .filter(|key| path::is_within(path, key))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        Ok(keys)
    }

    async fn get(&self, path: &str) -> Result<Vec<KvPair>> {
        let entries = self.inner.entries.read().unwrap();
        let pairs: Vec<KvPair> = entries
            .iter()
            .filter(|(key, _)| path::is_within(path, key))
            .map(|(key, stored)| KvPair::new(key.clone(), stored.value.clone()))
            .collect();
        if pairs.is_empty() {
            return Err(TransportError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        Ok(pairs)
    }

    async fn put(&self, path: &str, value: &Value, flatten: bool) -> Result<()> {
        let pairs = if flatten {
            flatten_typed(path, value)
        } else {
            let scalar = value
                .as_scalar()
                .ok_or_else(|| CodecError::UnsupportedValueKind {
                    path: path.to_string(),
                    kind: value.type_name().to_string(),
                })?;
            vec![KvPair::new(path::normalize(path), scalar)]
        };
        for pair in &pairs {
            path::validate_key(&pair.key)?;
        }

        trace!(path, flatten, count = pairs.len(), "storing pairs");
        let records = self.store(pairs);
        self.announce(records).await;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.inner.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unreachable {
                address: "in-memory".to_string(),
                reason: "store marked as down".to_string(),
            }
            .into())
        }
    }
}
