//! Metrics RPC handlers (`Declare`, `Unregister`, `Add`, `Sub`, `Set`, `Observe`).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use rpcmetrics_core::error::{MetricsError, Result};
use rpcmetrics_core::protocol::{Ack, Declaration, Metric, Operation, UnregisterRequest};

use crate::app_state::AppState;

use super::ApiError;

type RpcResult = std::result::Result<Json<Ack>, ApiError>;

fn decode<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(v)| v)
        .map_err(|rej| MetricsError::BadRequest(rej.body_text()))
}

fn ack(r: Result<()>) -> RpcResult {
    r.map(|()| Json(Ack::OK)).map_err(ApiError::from)
}

pub async fn declare(
    State(app): State<AppState>,
    body: std::result::Result<Json<Declaration>, JsonRejection>,
) -> RpcResult {
    ack(decode(body).and_then(|d| app.dispatcher().declare(&d)))
}

pub async fn unregister(
    State(app): State<AppState>,
    body: std::result::Result<Json<UnregisterRequest>, JsonRejection>,
) -> RpcResult {
    ack(decode(body).and_then(|r| app.dispatcher().unregister_in(&r.name, &r.namespace)))
}

fn mutate(
    app: &AppState,
    op: Operation,
    body: std::result::Result<Json<Metric>, JsonRejection>,
) -> RpcResult {
    ack(decode(body).and_then(|m| app.dispatcher().mutate(op, &m)))
}

pub async fn add(
    State(app): State<AppState>,
    body: std::result::Result<Json<Metric>, JsonRejection>,
) -> RpcResult {
    mutate(&app, Operation::Add, body)
}

pub async fn sub(
    State(app): State<AppState>,
    body: std::result::Result<Json<Metric>, JsonRejection>,
) -> RpcResult {
    mutate(&app, Operation::Sub, body)
}

pub async fn set(
    State(app): State<AppState>,
    body: std::result::Result<Json<Metric>, JsonRejection>,
) -> RpcResult {
    mutate(&app, Operation::Set, body)
}

pub async fn observe(
    State(app): State<AppState>,
    body: std::result::Result<Json<Metric>, JsonRejection>,
) -> RpcResult {
    mutate(&app, Operation::Observe, body)
}
