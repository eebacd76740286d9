use std::sync::Arc;

use keeper::{
    ConfigurationClient, Value,
    bus::{BusError, MessageEnvelope, in_memory::InMemoryBus},
    codec::flatten_serialize,
    constants::DEFAULT_TOPIC_PREFIX,
    kv::{KvPair, KvRecord},
    transport::KeeperTransport,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;

use crate::helpers::{
    BASE_PATH, ServiceConfiguration, TestKeeper, Writable, eventually, recv, sample_configuration,
    seeded_writable, test_keeper,
};

struct Watch<T = Writable> {
    updates: mpsc::Receiver<Option<T>>,
    errors: mpsc::Receiver<keeper::Error>,
}

fn start_watch(keeper: &TestKeeper, initial: Writable) -> Watch {
    watch_key(keeper, initial, "Writable")
}

fn watch_key<T>(keeper: &TestKeeper, initial: T, wait_key: &str) -> Watch<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let (update_tx, updates) = mpsc::channel(16);
    let (error_tx, errors) = mpsc::channel(16);
    keeper.client.watch_for_changes(
        update_tx,
        error_tx,
        initial,
        wait_key,
        Arc::new(keeper.bus.clone()),
    );
    Watch { updates, errors }
}

fn writable_key(name: &str) -> String {
    format!("{BASE_PATH}/Writable/{name}")
}

async fn announce(bus: &InMemoryBus, key: &str, value: &str) {
    let record = KvRecord::from_pair(&KvPair::new(key, value), 0, 0);
    let topic = format!("{DEFAULT_TOPIC_PREFIX}/{key}");
    bus.publish(MessageEnvelope::json(topic, &record).unwrap()).await;
}

#[tokio::test]
async fn handshake_comes_before_changes() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());

    assert_eq!(recv(&mut watch.updates).await, Some(None));

    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("DEBUG"), false)
        .await
        .unwrap();

    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.log_level, "DEBUG");
    assert!(updated.persist_data);
    assert_eq!(updated.max_events, 100);
}

#[tokio::test]
async fn stale_and_foreign_notifications_are_dropped() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    // Value no longer matches the store.
    announce(&keeper.bus, &writable_key("LogLevel"), "TRACE").await;
    // Key the store does not hold.
    announce(&keeper.bus, &writable_key("Ghost"), "boo").await;
    // Not JSON.
    keeper
        .bus
        .publish(MessageEnvelope {
            received_topic: format!("{DEFAULT_TOPIC_PREFIX}/{}", writable_key("LogLevel")),
            content_type: "text/plain".to_string(),
            payload: b"DEBUG".to_vec(),
        })
        .await;
    // Not a key record.
    keeper
        .bus
        .publish(
            MessageEnvelope::json(
                format!("{DEFAULT_TOPIC_PREFIX}/{}", writable_key("LogLevel")),
                "garbage",
            )
            .unwrap(),
        )
        .await;

    keeper
        .store
        .put(&writable_key("MaxEvents"), &Value::from("250"), false)
        .await
        .unwrap();

    // Notifications are handled in order, so the first update is the valid one.
    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.max_events, 250);
    assert_eq!(updated.log_level, "INFO");
}

#[tokio::test]
async fn root_key_notification_is_accepted() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    announce(&keeper.bus, &format!("{BASE_PATH}/Writable"), "").await;

    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.log_level, "INFO");
}

#[tokio::test]
async fn undecodable_changes_are_absorbed() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    keeper
        .store
        .put(&writable_key("MaxEvents"), &Value::from("lots"), false)
        .await
        .unwrap();
    keeper
        .store
        .put(&writable_key("MaxEvents"), &Value::from("10"), false)
        .await
        .unwrap();

    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.max_events, 10);
    assert!(watch.errors.try_recv().is_err());
}

#[tokio::test]
async fn fields_without_keys_keep_current_values() {
    let keeper = test_keeper();
    keeper.store.seed([
        KvPair::new(writable_key("LogLevel"), "INFO"),
        KvPair::new(writable_key("PersistData"), "false"),
        KvPair::new(writable_key("MaxEvents"), "1"),
    ]);
    let initial = Writable {
        insecure_secrets: [("DB".to_string(), "redis".to_string())].into(),
        ..Writable::default()
    };
    let mut watch = start_watch(&keeper, initial);
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("WARN"), false)
        .await
        .unwrap();

    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.log_level, "WARN");
    assert_eq!(updated.insecure_secrets["DB"], "redis");
}

#[tokio::test]
async fn emptied_containers_are_published_empty() {
    let keeper = test_keeper();
    let mut current = sample_configuration();
    current.writable.insecure_secrets = [("DB".to_string(), "redis".to_string())].into();

    // The operator has since cleared both containers.
    let mut cleared = current.clone();
    cleared.allowed_hosts.clear();
    cleared.writable.insecure_secrets.clear();
    keeper.store.seed(flatten_serialize(BASE_PATH, &cleared).unwrap());

    let mut watch: Watch<ServiceConfiguration> = watch_key(&keeper, current, "");
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("DEBUG"), false)
        .await
        .unwrap();

    let updated = recv(&mut watch.updates).await.flatten().unwrap();
    assert_eq!(updated.writable.log_level, "DEBUG");
    assert!(updated.allowed_hosts.is_empty());
    assert!(updated.writable.insecure_secrets.is_empty());
    assert_eq!(updated.service, cleared.service);
}

#[tokio::test]
async fn bus_errors_are_forwarded() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    keeper
        .bus
        .publish_error(BusError::Transport("broker restarted".to_string()))
        .await;
    let err = recv(&mut watch.errors).await.unwrap();
    assert_eq!(err.module(), "bus");

    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("DEBUG"), false)
        .await
        .unwrap();
    assert!(recv(&mut watch.updates).await.flatten().is_some());
}

#[tokio::test]
async fn subscribe_failure_ends_watch() {
    let keeper = test_keeper();
    keeper.bus.set_reject_subscriptions(true);
    let mut watch = start_watch(&keeper, Writable::default());

    let err = recv(&mut watch.errors).await.unwrap();
    assert!(err.is_subscription_error());
    // No handshake; the update channel just closes.
    assert_eq!(recv(&mut watch.updates).await, None);
    assert_eq!(keeper.bus.disconnect_count(), 1);
}

#[tokio::test]
async fn stop_watching_ends_every_watch() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut first = start_watch(&keeper, Writable::default());
    let mut second = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut first.updates).await, Some(None));
    assert_eq!(recv(&mut second.updates).await, Some(None));

    keeper.client.stop_watching();
    // A second stop with nothing running must not block.
    keeper.client.stop_watching();

    assert_eq!(recv(&mut first.updates).await, None);
    assert_eq!(recv(&mut second.updates).await, None);
    assert!(keeper.bus.disconnect_count() >= 1);
}

// Single-threaded so the watch task cannot run between the writes and the stop.
#[tokio::test(flavor = "current_thread")]
async fn stop_wins_over_queued_notifications() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));

    for level in ["DEBUG", "WARN", "ERROR"] {
        keeper
            .store
            .put(&writable_key("LogLevel"), &Value::from(level), false)
            .await
            .unwrap();
    }
    keeper.client.stop_watching();

    assert_eq!(recv(&mut watch.updates).await, None);
    let bus = keeper.bus.clone();
    eventually(move || bus.disconnect_count() == 1).await;
}

#[tokio::test]
async fn finished_watches_are_forgotten() {
    let keeper = test_keeper();
    keeper.bus.set_reject_subscriptions(true);
    let mut failed = start_watch(&keeper, Writable::default());
    assert!(recv(&mut failed.errors).await.unwrap().is_subscription_error());
    eventually(|| keeper.client.watch_count() == 0).await;

    keeper.bus.set_reject_subscriptions(false);
    keeper.store.seed(seeded_writable());
    let mut live = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut live.updates).await, Some(None));
    assert_eq!(keeper.client.watch_count(), 1);

    drop(live.updates);
    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("DEBUG"), false)
        .await
        .unwrap();
    eventually(|| keeper.client.watch_count() == 0).await;
}

#[tokio::test]
async fn dropping_the_receiver_ends_watch() {
    let keeper = test_keeper();
    keeper.store.seed(seeded_writable());
    let mut watch = start_watch(&keeper, Writable::default());
    assert_eq!(recv(&mut watch.updates).await, Some(None));
    drop(watch.updates);

    keeper
        .store
        .put(&writable_key("LogLevel"), &Value::from("DEBUG"), false)
        .await
        .unwrap();

    let bus = keeper.bus.clone();
    eventually(move || bus.disconnect_count() == 1).await;
}
