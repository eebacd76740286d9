use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use keeper::{
    ConfigurationClient, Error, KeeperClient, ServiceConfig, Value,
    constants::{API_KV_ROUTE, API_PING_ROUTE, API_VERSION, QUERY_FLATTEN, QUERY_KEY_ONLY},
    kv::{KvPair, KvRecord},
    transport::{
        KeeperTransport, TransportError,
        dtos::{AddKeysRequest, BaseResponse, ErrorResponse, MultiKeyResponse, MultiKvResponse},
        http::HttpTransport,
        in_memory::InMemoryTransport,
    },
};
use url::Url;

use crate::helpers::{BASE_PATH, ServiceConfiguration, sample_configuration, text};

fn base(status: StatusCode) -> BaseResponse {
    BaseResponse {
        api_version: API_VERSION.to_string(),
        status_code: status.as_u16(),
        ..BaseResponse::default()
    }
}

fn error_response(err: Error) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };
    let body = ErrorResponse {
        message: Some(err.to_string()),
        ..base(status)
    };
    (status, Json(body)).into_response()
}

async fn ping() -> Json<BaseResponse> {
    Json(base(StatusCode::OK))
}

async fn get_key(
    State(store): State<InMemoryTransport>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get(QUERY_KEY_ONLY).is_some_and(|v| v == "true") {
        return match store.keys(&path).await {
            Ok(keys) => Json(MultiKeyResponse {
                base: base(StatusCode::OK),
                response: keys,
            })
            .into_response(),
            Err(e) => error_response(e),
        };
    }

    match store.get(&path).await {
        Ok(pairs) => Json(MultiKvResponse {
            base: base(StatusCode::OK),
            response: pairs
                .iter()
                .map(|pair| KvRecord::from_pair(pair, 1_700_000_000_000, 1_700_000_000_000))
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn put_key(
    State(store): State<InMemoryTransport>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(request): Json<AddKeysRequest>,
) -> Response {
    let flatten = params.get(QUERY_FLATTEN).is_some_and(|v| v == "true");
    match store.put(&path, &request.value, flatten).await {
        Ok(()) => Json(base(StatusCode::OK)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Serve a mock keeper over `store`, returning its base URL.
async fn spawn_mock_keeper(store: InMemoryTransport) -> Url {
    let router = Router::new()
        .route(API_PING_ROUTE, get(ping))
        .route(&format!("{API_KV_ROUTE}/{{*path}}"), get(get_key).put(put_key))
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

async fn http_transport(store: InMemoryTransport) -> HttpTransport {
    let url = spawn_mock_keeper(store).await;
    HttpTransport::with_base_url(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn ping_and_reads() {
    let store = InMemoryTransport::new();
    store.seed([
        KvPair::new("svc/Writable/LogLevel", "INFO"),
        KvPair::new("svc/Service/Port", 59880i64),
    ]);
    let transport = http_transport(store).await;

    transport.ping().await.unwrap();

    let mut keys = transport.keys("svc").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["svc/Service/Port", "svc/Writable/LogLevel"]);

    let pairs = transport.get("svc/Service").await.unwrap();
    assert_eq!(pairs, vec![KvPair::new("svc/Service/Port", 59880i64)]);
}

#[tokio::test]
async fn missing_key_maps_to_not_found() {
    let transport = http_transport(InMemoryTransport::new()).await;
    let err = transport.get("svc/Nothing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transport_error());
    assert!(transport.keys("svc").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn writes_reach_the_store() {
    let store = InMemoryTransport::new();
    let transport = http_transport(store.clone()).await;

    transport
        .put("svc/LogLevel", &Value::from("DEBUG"), false)
        .await
        .unwrap();
    transport
        .put(
            "svc/Service",
            &Value::map([("Port", Value::from(59880)), ("Host", Value::from("localhost"))]),
            true,
        )
        .await
        .unwrap();

    assert_eq!(store.value("svc/LogLevel"), text("DEBUG"));
    assert_eq!(store.value("svc/Service/Host"), text("localhost"));
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn rejected_write_carries_server_message() {
    let transport = http_transport(InMemoryTransport::new()).await;
    let err = transport
        .put("svc/Hosts", &Value::List(vec![Value::from("a")]), false)
        .await
        .unwrap_err();

    assert!(err.is_transport_error());
    match err {
        Error::Transport(TransportError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("svc/Hosts"), "unexpected message: {message}");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_keeper() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let transport = HttpTransport::with_base_url(url, Duration::from_secs(1)).unwrap();
    let err = transport.ping().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Unreachable { .. })
    ));
}

#[tokio::test]
async fn client_over_http() {
    let store = InMemoryTransport::new();
    let url = spawn_mock_keeper(store.clone()).await;
    let config = ServiceConfig {
        host: url.host_str().unwrap().to_string(),
        port: url.port().unwrap(),
        base_path: BASE_PATH.to_string(),
        ..ServiceConfig::default()
    };
    let client = KeeperClient::new(config).unwrap();

    assert!(client.is_alive().await);
    assert!(!client.has_configuration().await.unwrap());

    client
        .put_configuration(&sample_configuration(), false)
        .await
        .unwrap();
    let config: ServiceConfiguration = client.get_configuration().await.unwrap();
    assert_eq!(config, sample_configuration());

    let report = client
        .put_configuration(&sample_configuration(), false)
        .await
        .unwrap();
    assert!(report.written.is_empty());

    client
        .put_configuration(&sample_configuration(), true)
        .await
        .unwrap();
    assert_eq!(
        client.get_configuration_value("Service/Port").await.unwrap(),
        b"59880"
    );
}

#[tokio::test]
async fn shared_client_handle() {
    let store = InMemoryTransport::new();
    let transport: Arc<dyn KeeperTransport> = Arc::new(http_transport(store).await);
    let client = KeeperClient::with_transport(ServiceConfig::for_base_path("svc"), transport);
    assert_eq!(client.transport().transport_type(), "http");
}
