//! rpcmetrics server
//!
//! - RPC surface: POST /rpc/metrics/{declare,unregister,add,sub,set,observe}
//! - Scrape endpoint: GET /metrics on `metrics.address`
//! - Config path from argv[1], default `rpcmetrics.yaml`

use std::future::IntoFuture;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use rpcmetrics_core::error::{MetricsError, Result};
use rpcmetrics_server::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1);
    if let Err(e) = run(path.as_deref()).await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "rpcmetrics-server failed");
        std::process::exit(1);
    }
}

async fn run(path: Option<&str>) -> Result<()> {
    let state = app_state::AppState::new(config::load(path)?)?;
    let rpc_addr = config::schema::parse_addr("rpc.listen", &state.cfg().rpc.listen)?;
    let metrics_addr = config::schema::parse_addr("metrics.address", &state.cfg().metrics.address)?;

    state.serve()?;
    if let Some(process) = state.process() {
        process.spawn_updater();
    }

    let rpc_listener = bind(rpc_addr).await?;
    let metrics_listener = bind(metrics_addr).await?;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
        let _ = tx.send(true);
    });

    tracing::info!(%rpc_addr, %metrics_addr, "rpcmetrics-server starting");

    let rpc = axum::serve(rpc_listener, router::build_rpc_router(state.clone()))
        .with_graceful_shutdown(shutdown(rx.clone()))
        .into_future();
    let metrics = axum::serve(metrics_listener, router::build_exposition_router(state))
        .with_graceful_shutdown(shutdown(rx))
        .into_future();

    tokio::try_join!(rpc, metrics)
        .map_err(|e| MetricsError::Internal(format!("server failed: {e}")))?;

    tracing::info!("rpcmetrics-server stopped");
    Ok(())
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| MetricsError::Internal(format!("failed to bind {addr}: {e}")))
}

async fn shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow();
        if stop || rx.changed().await.is_err() {
            break;
        }
    }
}
