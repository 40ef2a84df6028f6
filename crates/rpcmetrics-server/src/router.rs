//! Axum router wiring.
//!
//! Two routers, served on separate listeners: the RPC surface
//! (`/rpc/metrics/*`) and the scrape endpoint (`/metrics`). Both carry a
//! per-request deadline; the RPC router also caps request bodies.

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, rpc};

pub fn build_rpc_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.cfg().rpc.request_timeout_secs);
    let max_body = state.cfg().rpc.max_body_bytes;

    Router::new()
        .route("/rpc/metrics/declare", post(rpc::handlers::declare))
        .route("/rpc/metrics/unregister", post(rpc::handlers::unregister))
        .route("/rpc/metrics/add", post(rpc::handlers::add))
        .route("/rpc/metrics/sub", post(rpc::handlers::sub))
        .route("/rpc/metrics/set", post(rpc::handlers::set))
        .route("/rpc/metrics/observe", post(rpc::handlers::observe))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(middleware::from_fn_with_state(timeout, deadline))
        .with_state(state)
}

pub fn build_exposition_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.cfg().metrics.request_timeout_secs);

    Router::new()
        .route("/metrics", get(rpc::exposition::metrics))
        .layer(middleware::from_fn_with_state(timeout, deadline))
        .with_state(state)
}

async fn deadline(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => {
            tracing::warn!(%path, timeout_ms = limit.as_millis() as u64, "request deadline exceeded");
            StatusCode::REQUEST_TIMEOUT.into_response()
        }
    }
}
