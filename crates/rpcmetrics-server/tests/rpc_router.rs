#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use rpcmetrics_server::{app_state::AppState, config, router};

fn app_state() -> AppState {
    app_state_from("version: 1\n")
}

fn app_state_from(yaml: &str) -> AppState {
    let mut cfg = config::load_from_str(yaml).unwrap();
    cfg.metrics.process_collector = false;
    let state = AppState::new(cfg).unwrap();
    state.serve().unwrap();
    state
}

async fn call(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn scrape(router: &Router) -> String {
    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn declare_add_scrape() {
    let state = app_state();
    let rpc = router::build_rpc_router(state.clone());
    let metrics = router::build_exposition_router(state);

    let (status, body) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({
            "name": "jobs_total",
            "collector": { "namespace": "app", "type": "counter", "help": "Processed jobs", "labels": ["queue"] }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, _) = call(
        &rpc,
        "/rpc/metrics/add",
        json!({ "Name": "jobs_total", "Namespace": "app", "Value": 2.0, "Labels": ["default"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = scrape(&metrics).await;
    assert!(text.contains("# HELP app_jobs_total Processed jobs\n"));
    assert!(text.contains("app_jobs_total{queue=\"default\"} 2\n"));
}

#[tokio::test]
async fn error_bodies_carry_codes() {
    let rpc = router::build_rpc_router(app_state());

    let (status, body) = call(&rpc, "/rpc/metrics/add", json!({ "name": "nope", "value": 1.0 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
    assert_eq!(
        body["error"]["msg"],
        json!("undefined collector, name: nope, namespace: ")
    );

    let (status, body) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "lat", "collector": { "type": "histogram" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(&rpc, "/rpc/metrics/set", json!({ "name": "lat", "value": 1.0 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("UNSUPPORTED_OPERATION"));

    let (status, body) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "lat", "collector": { "type": "histogram" } }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("ALREADY_EXISTS"));

    let (status, body) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "m", "collector": { "type": "meter" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("INVALID_TYPE"));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let rpc = router::build_rpc_router(app_state());

    let (status, body) = call(&rpc, "/rpc/metrics/observe", json!({ "name": "x", "valeu": 1.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn unregister_removes_from_scrape() {
    let state = app_state();
    let rpc = router::build_rpc_router(state.clone());
    let metrics = router::build_exposition_router(state);

    let (status, _) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "workers", "collector": { "namespace": "pool", "type": "gauge" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(scrape(&metrics).await.contains("pool_workers 0\n"));

    let (status, _) = call(
        &rpc,
        "/rpc/metrics/unregister",
        json!({ "name": "workers", "namespace": "pool" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!scrape(&metrics).await.contains("pool_workers"));

    let (status, body) = call(&rpc, "/rpc/metrics/unregister", json!({ "name": "workers" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let rpc = router::build_rpc_router(app_state_from("version: 1\nrpc:\n  max_body_bytes: 64\n"));

    let help = "x".repeat(256);
    let (status, body) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "big", "collector": { "type": "gauge", "help": help } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));

    let (status, _) = call(
        &rpc,
        "/rpc/metrics/declare",
        json!({ "name": "small", "collector": { "type": "gauge" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
