use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use keeper::{
    ConfigurationClient, Error, KeeperClient, Result, ServiceConfig, Value,
    client::ClientError,
    kv::KvPair,
    transport::{KeeperTransport, TransportError, in_memory::InMemoryTransport},
};

use crate::helpers::{BASE_PATH, ServiceConfiguration, sample_configuration, test_keeper, text};

#[tokio::test]
async fn missing_configuration_is_not_found() {
    let keeper = test_keeper();
    assert!(!keeper.client.has_configuration().await.unwrap());

    let err = keeper
        .client
        .get_configuration::<ServiceConfiguration>()
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        Error::Client(ClientError::ConfigurationNotFound { .. })
    ));
}

#[tokio::test]
async fn seed_then_read_back() {
    let keeper = test_keeper();
    let report = keeper
        .client
        .put_configuration(&sample_configuration(), false)
        .await
        .unwrap();
    assert_eq!(report.written.len(), 9);

    assert!(keeper.client.has_configuration().await.unwrap());
    assert!(keeper.client.has_sub_configuration("Writable").await.unwrap());
    assert!(!keeper.client.has_sub_configuration("Clients").await.unwrap());

    let config: ServiceConfiguration = keeper.client.get_configuration().await.unwrap();
    assert_eq!(config, sample_configuration());
}

#[tokio::test]
async fn merge_keeps_operator_changes() {
    let keeper = test_keeper();
    keeper
        .client
        .put_configuration(&sample_configuration(), false)
        .await
        .unwrap();
    keeper
        .client
        .put_configuration_value("Writable/LogLevel", b"DEBUG")
        .await
        .unwrap();
    let before = keeper.store.pairs();

    let report = keeper
        .client
        .put_configuration(&sample_configuration(), false)
        .await
        .unwrap();
    assert!(report.written.is_empty());
    assert_eq!(keeper.store.pairs(), before);

    let config: ServiceConfiguration = keeper.client.get_configuration().await.unwrap();
    assert_eq!(config.writable.log_level, "DEBUG");
}

#[tokio::test]
async fn overwrite_replaces_operator_changes() {
    let keeper = test_keeper();
    keeper
        .client
        .put_configuration_value("Writable/LogLevel", b"DEBUG")
        .await
        .unwrap();

    keeper
        .client
        .put_configuration(&sample_configuration(), true)
        .await
        .unwrap();

    let value = keeper
        .client
        .get_configuration_value("Writable/LogLevel")
        .await
        .unwrap();
    assert_eq!(value, b"INFO");
}

#[tokio::test]
async fn configuration_map_honors_overwrite() {
    let keeper = test_keeper();
    keeper
        .client
        .put_configuration_value("Writable/LogLevel", b"DEBUG")
        .await
        .unwrap();

    let map = BTreeMap::from([
        ("Writable/LogLevel".to_string(), Value::from("INFO")),
        (
            "Clients".to_string(),
            Value::map([("Metadata", Value::map([("Port", Value::from(59881))]))]),
        ),
    ]);

    let report = keeper.client.put_configuration_map(&map, false).await.unwrap();
    assert_eq!(report.skipped, vec![format!("{BASE_PATH}/Writable/LogLevel")]);
    assert_eq!(
        keeper.store.value(&format!("{BASE_PATH}/Clients/Metadata/Port")),
        text("59881")
    );
    assert_eq!(
        keeper.store.value(&format!("{BASE_PATH}/Writable/LogLevel")),
        text("DEBUG")
    );

    keeper.client.put_configuration_map(&map, true).await.unwrap();
    assert_eq!(
        keeper.store.value(&format!("{BASE_PATH}/Writable/LogLevel")),
        text("INFO")
    );
}

#[tokio::test]
async fn single_values() {
    let keeper = test_keeper();
    keeper.store.seed([
        KvPair::new(format!("{BASE_PATH}/Service/Port"), 59880i64),
        KvPair::new(format!("{BASE_PATH}/Service/Host"), "localhost"),
    ]);

    assert!(keeper.client.configuration_value_exists("Service/Port").await.unwrap());
    assert!(!keeper.client.configuration_value_exists("Service/Timeout").await.unwrap());
    assert_eq!(
        keeper.client.get_configuration_value("Service/Port").await.unwrap(),
        b"59880"
    );
    assert_eq!(
        keeper
            .client
            .get_configuration_value_by_full_path(&format!("{BASE_PATH}/Service/Host"))
            .await
            .unwrap(),
        b"localhost"
    );

    let err = keeper
        .client
        .get_configuration_value("Service/Timeout")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Client(ClientError::ValueNotFound { .. })));

    let mut keys = keeper.client.get_configuration_keys("Service").await.unwrap();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            format!("{BASE_PATH}/Service/Host"),
            format!("{BASE_PATH}/Service/Port"),
        ]
    );
}

#[tokio::test]
async fn invalid_value_name_is_rejected() {
    let keeper = test_keeper();
    let err = keeper
        .client
        .put_configuration_value("Writable/Log Level", b"INFO")
        .await
        .unwrap_err();
    assert!(err.is_codec_error());
    assert!(keeper.store.is_empty());
}

#[tokio::test]
async fn non_utf8_value_is_rejected() {
    let keeper = test_keeper();
    let err = keeper
        .client
        .put_configuration_value("Writable/LogLevel", &[0x49, 0xff, 0x4e])
        .await
        .unwrap_err();
    assert!(err.is_unsupported_kind());
    assert!(keeper.store.is_empty());

    keeper
        .client
        .put_configuration_value("Writable/LogLevel", "DÉBUG".as_bytes())
        .await
        .unwrap();
    assert_eq!(
        keeper.client.get_configuration_value("Writable/LogLevel").await.unwrap(),
        "DÉBUG".as_bytes()
    );
}

#[tokio::test]
async fn liveness_follows_store() {
    let keeper = test_keeper();
    assert!(keeper.client.is_alive().await);
    keeper.store.set_alive(false);
    assert!(!keeper.client.is_alive().await);
}

/// Store that refuses writes to keys containing a marker.
struct RefusingTransport {
    inner: InMemoryTransport,
    marker: &'static str,
}

#[async_trait]
impl KeeperTransport for RefusingTransport {
    fn transport_type(&self) -> &'static str {
        "refusing"
    }

    async fn keys(&self, path: &str) -> Result<Vec<String>> {
        self.inner.keys(path).await
    }

    async fn get(&self, path: &str) -> Result<Vec<KvPair>> {
        self.inner.get(path).await
    }

    async fn put(&self, path: &str, value: &Value, flatten: bool) -> Result<()> {
        if path.contains(self.marker) {
            return Err(TransportError::Status {
                status: 500,
                message: "write refused".to_string(),
            }
            .into());
        }
        self.inner.put(path, value, flatten).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn merge_stops_at_first_failure_without_rollback() {
    let store = InMemoryTransport::new();
    let client = KeeperClient::with_transport(
        ServiceConfig::for_base_path("svc"),
        Arc::new(RefusingTransport {
            inner: store.clone(),
            marker: "B/Port",
        }),
    );

    let value = Value::map([
        ("A", Value::from(1)),
        ("B", Value::map([("Port", Value::from(2))])),
        ("C", Value::from(3)),
    ]);
    let err = client.put_configuration(&value, false).await.unwrap_err();

    assert!(err.is_partial_write());
    let Error::Client(client_err) = &err else {
        panic!("expected a client error, got {err:?}");
    };
    assert_eq!(client_err.written_keys(), ["svc/A".to_string()]);
    assert_eq!(store.value("svc/A"), text("1"));
    assert_eq!(store.value("svc/C"), None);
}
