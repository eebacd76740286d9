use std::{collections::BTreeMap, sync::Arc, time::Duration};

use keeper::{
    KeeperClient, ServiceConfig,
    bus::in_memory::InMemoryBus,
    constants::DEFAULT_TOPIC_PREFIX,
    kv::{KvPair, Scalar},
    transport::in_memory::InMemoryTransport,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub const BASE_PATH: &str = "edgex/core-data";

/// Writable section of a service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Writable {
    pub log_level: String,
    pub persist_data: bool,
    pub max_events: u32,
    #[serde(default)]
    pub insecure_secrets: BTreeMap<String, String>,
}

/// A full service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceConfiguration {
    pub writable: Writable,
    pub service: ServiceInfo,
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInfo {
    pub host: String,
    pub port: u16,
    pub request_timeout: String,
}

pub fn sample_configuration() -> ServiceConfiguration {
    ServiceConfiguration {
        writable: Writable {
            log_level: "INFO".to_string(),
            persist_data: true,
            max_events: 100,
            insecure_secrets: BTreeMap::new(),
        },
        service: ServiceInfo {
            host: "localhost".to_string(),
            port: 59880,
            request_timeout: "5s".to_string(),
        },
        allowed_hosts: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
    }
}

/// Writable keys as an operator would have stored them.
pub fn seeded_writable() -> Vec<KvPair> {
    vec![
        KvPair::new(format!("{BASE_PATH}/Writable/LogLevel"), "INFO"),
        KvPair::new(format!("{BASE_PATH}/Writable/PersistData"), "true"),
        KvPair::new(format!("{BASE_PATH}/Writable/MaxEvents"), "100"),
        KvPair::new(format!("{BASE_PATH}/Writable/InsecureSecrets/Placeholder"), ""),
    ]
}

/// In-memory keeper announcing writes on its own bus.
pub struct TestKeeper {
    pub client: KeeperClient,
    pub store: InMemoryTransport,
    pub bus: InMemoryBus,
}

pub fn test_keeper() -> TestKeeper {
    let bus = InMemoryBus::new();
    let store = InMemoryTransport::new().with_notifications(bus.clone(), DEFAULT_TOPIC_PREFIX);
    let client = KeeperClient::with_transport(ServiceConfig::for_base_path(BASE_PATH), Arc::new(store.clone()));
    TestKeeper { client, store, bus }
}

pub fn text(value: &str) -> Option<Scalar> {
    Some(Scalar::from(value))
}

/// Receive from `rx`, failing the test if nothing arrives in time.
pub async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for channel")
}

/// Wait until `check` holds, failing the test after a timeout.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
