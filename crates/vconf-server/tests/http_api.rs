//! HTTP route tests through `warp::test`

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use vconf_server::routes::DEFAULT_MAX_BODY_BYTES;
use vconf_server::{routes, ConfigResponse, ConfigService, ErrorBody};
use vconf_store::{MemoryRecordStore, RecordKey};
use vconf_test_utils::{filter_transform, random_name, seeded_store, vector_document};
use warp::http::StatusCode;

fn service(store: MemoryRecordStore) -> ConfigService {
    ConfigService::new(Arc::new(store))
}

async fn send(
    service: &ConfigService,
    method: &str,
    path: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let filter = routes(service.clone(), DEFAULT_MAX_BODY_BYTES);
    let response = warp::test::request()
        .method(method)
        .path(path)
        .json(body)
        .reply(&filter)
        .await;

    let value = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), value)
}

fn key_body(key: &RecordKey) -> Value {
    json!({
        "configMapName": key.name,
        "configMapNameSpace": key.namespace,
    })
}

#[tokio::test]
async fn get_config_cases() {
    let (store, key) = seeded_store();
    let service = service(store);

    let cases = [
        ("ok", key_body(&key), StatusCode::OK),
        (
            "invalid namespace",
            json!({"configMapName": key.name, "configMapNameSpace": random_name(4)}),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            "invalid config name",
            json!({"configMapName": random_name(8), "configMapNameSpace": key.namespace}),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            "missing namespace",
            json!({"configMapName": key.name}),
            StatusCode::BAD_REQUEST,
        ),
        (
            "missing config name",
            json!({"configMapNameSpace": key.namespace}),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (name, body, expected) in cases {
        let (status, value) = send(&service, "GET", "/config", &body).await;
        assert_eq!(status, expected, "case `{name}`");
        if expected == StatusCode::OK {
            let response: ConfigResponse = serde_json::from_value(value).unwrap();
            assert_eq!(response, ConfigResponse::from(vector_document()));
        } else {
            let error: ErrorBody = serde_json::from_value(value).unwrap();
            assert!(!error.error.is_empty(), "case `{name}`");
        }
    }
}

#[tokio::test]
async fn post_config_cases() {
    let (store, key) = seeded_store();
    let service = service(store);
    let transforms = json!({
        "filter_test": filter_transform(".status == 200", "k8s_logs_source"),
    });

    let mut ok_body = key_body(&key);
    ok_body["transforms"] = transforms.clone();

    let cases = [
        ("ok", ok_body, StatusCode::OK),
        (
            "invalid namespace",
            json!({"configMapName": key.name, "configMapNameSpace": random_name(4)}),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            "invalid config name",
            json!({"configMapName": random_name(8), "configMapNameSpace": key.namespace}),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            "missing namespace",
            json!({"configMapName": key.name}),
            StatusCode::BAD_REQUEST,
        ),
        (
            "missing config name",
            json!({"configMapNameSpace": key.namespace}),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (name, body, expected) in cases {
        let (status, value) = send(&service, "POST", "/config", &body).await;
        assert_eq!(status, expected, "case `{name}`");
        if expected == StatusCode::OK {
            assert_eq!(value["transforms"]["filter_test"], transforms["filter_test"]);
            assert!(value["transforms"].get("filter_k8s_logs").is_some());
        } else {
            assert!(value["error"].is_string(), "case `{name}`");
        }
    }
}

#[tokio::test]
async fn post_then_get_returns_merged_document() {
    let (store, key) = seeded_store();
    let service = service(store);

    let mut body = key_body(&key);
    body["transforms"] = json!({"filter_test": filter_transform(".status == 200", "k8s_logs_source")});
    let (status, posted) = send(&service, "POST", "/config", &body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = send(&service, "GET", "/config", &key_body(&key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, posted);

    let original = serde_json::to_value(ConfigResponse::from(vector_document())).unwrap();
    assert_eq!(fetched["sources"], original["sources"]);
    assert_eq!(fetched["sinks"], original["sinks"]);
    assert_eq!(fetched["data_dir"], json!("/vector-data-dir"));
}

#[tokio::test]
async fn get_config_from_query_string() {
    let (store, key) = seeded_store();
    let filter = routes(service(store), DEFAULT_MAX_BODY_BYTES);

    let response = warp::test::request()
        .method("GET")
        .path(&format!(
            "/config?configMapName={}&configMapNameSpace={}",
            key.name, key.namespace
        ))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let value: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(value["data_dir"], json!("/vector-data-dir"));
}

#[tokio::test]
async fn response_shape_has_exactly_four_keys() {
    let store = MemoryRecordStore::default();
    let key = RecordKey::new("logging", "vector");
    store
        .create(key.clone(), "api:\n  enabled: true\nsources: {}\n")
        .unwrap();

    let (status, value) = send(&service(store), "GET", "/config", &key_body(&key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        value,
        json!({"data_dir": null, "sources": {}, "transforms": {}, "sinks": {}})
    );
}

#[tokio::test]
async fn post_keeps_unknown_top_level_keys_in_store() {
    let store = Arc::new(MemoryRecordStore::default());
    let key = RecordKey::new("logging", "vector");
    store
        .create(key.clone(), "api:\n  enabled: true\nsources: {}\n")
        .unwrap();
    let service = ConfigService::new(store.clone());

    let mut body = key_body(&key);
    body["sinks"] = json!({"out": {"type": "console", "inputs": ["in"]}});
    let (status, _) = send(&service, "POST", "/config", &body).await;
    assert_eq!(status, StatusCode::OK);

    let stored = vconf_document::parse(&store.payload(&key).unwrap()).unwrap();
    assert_eq!(stored.extra["api"], json!({"enabled": true}));
    assert!(stored.sinks.contains_key("out"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (store, _) = seeded_store();
    let filter = routes(service(store), DEFAULT_MAX_BODY_BYTES);

    for method in ["GET", "POST"] {
        let response = warp::test::request()
            .method(method)
            .path("/config")
            .header("content-type", "application/json")
            .body("{\"configMapName\": ")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method}");
        let error: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert!(error.error.starts_with("invalid request body"));
    }
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (store, key) = seeded_store();
    let filter = routes(service(store), 64);

    let mut body = key_body(&key);
    body["sources"] = json!({"big": {"type": "stdin", "padding": "x".repeat(256)}});

    for method in ["GET", "POST"] {
        let response = warp::test::request()
            .method(method)
            .path("/config")
            .json(&body)
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE, "{method}");
        let error: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert!(!error.error.is_empty());
    }
}

#[tokio::test]
async fn body_of_unknown_length_is_refused() {
    let (store, key) = seeded_store();
    let filter = routes(service(store), DEFAULT_MAX_BODY_BYTES);

    let response = warp::test::request()
        .method("GET")
        .path(&format!(
            "/config?configMapName={}&configMapNameSpace={}",
            key.name, key.namespace
        ))
        .header("transfer-encoding", "chunked")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::LENGTH_REQUIRED);
}

#[tokio::test]
async fn post_without_body_is_bad_request() {
    let (store, _) = seeded_store();
    let filter = routes(service(store), DEFAULT_MAX_BODY_BYTES);

    let response = warp::test::request()
        .method("POST")
        .path("/config")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(error.error, "configMapName is required");
}

#[tokio::test]
async fn merge_key_named_entries_survive_post_and_get() {
    let (store, key) = seeded_store();
    let service = service(store);

    let mut body = key_body(&key);
    body["transforms"] = json!({"<<": {"type": "filter", "inputs": ["k8s_logs_source"]}});
    body["sinks"] = json!({"k8s_logs_sink": {"<<": "x", "type": "file"}});
    let (status, posted) = send(&service, "POST", "/config", &body).await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = send(&service, "GET", "/config", &key_body(&key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, posted);
    assert_eq!(fetched["transforms"]["<<"]["type"], json!("filter"));
    assert!(fetched["transforms"].get("filter_k8s_logs").is_some());
    assert_eq!(fetched["sinks"]["k8s_logs_sink"], json!({"<<": "x", "type": "file"}));
}

#[tokio::test]
async fn unknown_route_and_method() {
    let (store, _) = seeded_store();
    let filter = routes(service(store), DEFAULT_MAX_BODY_BYTES);

    let response = warp::test::request()
        .method("GET")
        .path("/nope")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = warp::test::request()
        .method("DELETE")
        .path("/config")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn healthz() {
    let filter = routes(service(MemoryRecordStore::default()), DEFAULT_MAX_BODY_BYTES);

    let response = warp::test::request()
        .method("GET")
        .path("/healthz")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"ok");
}
