//! Publish/subscribe abstractions for key change notifications.
//!
//! The keeper publishes every key write as a JSON [`KvRecord`](crate::kv::KvRecord)
//! on a topic made of the topic prefix and the key. Watches subscribe through
//! the [`MessageBus`] trait, so any broker client can carry them.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    Result,
    constants::{CONTENT_TYPE_JSON, KEY_DELIMITER_CHAR, TOPIC_SINGLE_WILDCARD, TOPIC_WILDCARD},
};

mod errors;
pub mod in_memory;

pub use errors::BusError;

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    /// Concrete topic the message was published on
    pub received_topic: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl MessageEnvelope {
    /// Build a JSON envelope for `body`.
    pub fn json<T: Serialize + ?Sized>(topic: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self {
            received_topic: topic.into(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            payload: serde_json::to_vec(body)?,
        })
    }

    pub fn is_json(&self) -> bool {
        self.content_type == CONTENT_TYPE_JSON
    }
}

/// Streams of a live subscription.
///
/// The subscription ends when the bus closes `messages`. Failures the bus
/// reports while the subscription is live arrive on `errors`.
#[derive(Debug)]
pub struct Subscription {
    pub messages: mpsc::Receiver<MessageEnvelope>,
    pub errors: mpsc::Receiver<BusError>,
}

/// Trait for publish/subscribe brokers carrying change notifications.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Subscribe to `topics`, which may use `#` and `+` wildcards.
    ///
    /// # Errors
    /// [`BusError::SubscribeFailed`] when the broker refuses a topic.
    async fn subscribe(&self, topics: &[String]) -> Result<Subscription>;

    /// Disconnect from the broker, ending every subscription made through it.
    async fn disconnect(&self) -> Result<()>;
}

/// Returns true if `topic` matches the subscription `filter`.
///
/// `+` matches exactly one level, a trailing `#` matches any number of levels,
/// including none.
///
/// ```
/// # use keeper::bus::topic_matches;
/// assert!(topic_matches("keeper/configs/svc/#", "keeper/configs/svc/Writable/LogLevel"));
/// assert!(topic_matches("keeper/configs/svc/#", "keeper/configs/svc"));
/// assert!(topic_matches("keeper/+/svc/#", "keeper/configs/svc/Port"));
/// assert!(!topic_matches("keeper/configs/svc/#", "keeper/configs/svc2/Port"));
/// ```
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split(KEY_DELIMITER_CHAR);
    let mut topic_levels = topic.split(KEY_DELIMITER_CHAR);
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some(TOPIC_WILDCARD), _) => return filter_levels.next().is_none(),
            (Some(TOPIC_SINGLE_WILDCARD), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
