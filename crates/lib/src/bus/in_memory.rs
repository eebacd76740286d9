//! In-process message bus.
//!
//! Routes published envelopes to matching subscribers through tokio channels.
//! Clones share the same broker, so a publisher and a watch can hold their
//! own handles.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use super::{BusError, MessageBus, MessageEnvelope, Subscription, topic_matches};
use crate::Result;

/// Buffered messages per subscription before publishers wait.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

struct Subscriber {
    filters: Vec<String>,
    messages: mpsc::Sender<MessageEnvelope>,
    errors: mpsc::Sender<BusError>,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<Vec<Subscriber>>,
    reject_subscriptions: AtomicBool,
    disconnects: AtomicUsize,
}

/// A broker living in this process.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `envelope` to every subscriber whose filters match its topic.
    ///
    /// Returns the number of subscribers reached.
    pub async fn publish(&self, envelope: MessageEnvelope) -> usize {
        let targets: Vec<_> = {
            let mut subscribers = self.inner.subscribers.lock().unwrap();
            subscribers.retain(|s| !s.messages.is_closed());
            subscribers
                .iter()
                .filter(|s| {
                    s.filters
                        .iter()
                        .any(|f| topic_matches(f, &envelope.received_topic))
                })
                .map(|s| s.messages.clone())
                .collect()
        };

        let mut delivered = 0;
        for target in targets {
            if target.send(envelope.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        trace!(topic = %envelope.received_topic, delivered, "published message");
        delivered
    }

    /// Report `error` on every live subscription.
    pub async fn publish_error(&self, error: BusError) {
        let targets: Vec<_> = {
            let subscribers = self.inner.subscribers.lock().unwrap();
            subscribers.iter().map(|s| s.errors.clone()).collect()
        };
        for target in targets {
            let _ = target.send(error.clone()).await;
        }
    }

    /// Make subsequent subscriptions fail, or succeed again.
    pub fn set_reject_subscriptions(&self, reject: bool) {
        self.inner
            .reject_subscriptions
            .store(reject, Ordering::SeqCst);
    }

    /// Number of subscriptions still open.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        subscribers.retain(|s| !s.messages.is_closed());
        subscribers.len()
    }

    /// Number of times [`MessageBus::disconnect`] was called.
    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn subscribe(&self, topics: &[String]) -> Result<Subscription> {
        if self.inner.reject_subscriptions.load(Ordering::SeqCst) {
            return Err(BusError::SubscribeFailed {
                topic: topics.join(","),
                reason: "subscriptions are rejected".to_string(),
            }
            .into());
        }

        let (messages_tx, messages) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let (errors_tx, errors) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.inner.subscribers.lock().unwrap().push(Subscriber {
            filters: topics.to_vec(),
            messages: messages_tx,
            errors: errors_tx,
        });
        trace!(?topics, "subscribed");
        Ok(Subscription { messages, errors })
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.subscribers.lock().unwrap().clear();
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
