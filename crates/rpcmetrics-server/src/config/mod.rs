//! Server config: strict YAML, validated on load.
//!
//! Unknown keys anywhere in the document are rejected, and every entry of
//! `metrics.collect` is run through the collector factory so a bad declaration
//! fails at startup rather than on first use.

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use rpcmetrics_core::error::{MetricsError, Result};

pub use schema::{MetricsSection, RedeclarePolicy, RpcSection, ServerConfig};

/// Config path used when none is given.
pub const DEFAULT_PATH: &str = "rpcmetrics.yaml";

/// Load from `path`, or from [`DEFAULT_PATH`] when `None`.
pub fn load(path: Option<&str>) -> Result<ServerConfig> {
    let path = path.unwrap_or(DEFAULT_PATH);
    let cfg = load_from_file(path)?;
    tracing::info!(
        path = %path,
        collectors = cfg.metrics.collect.len(),
        "config loaded"
    );
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MetricsError::BadRequest(format!("config file not found: {path}")),
        _ => MetricsError::Internal(format!("read config failed ({path}): {e}")),
    })?;
    load_from_str(&s).map_err(|e| match e {
        MetricsError::BadRequest(msg) => MetricsError::BadRequest(format!("{path}: {msg}")),
        other => other,
    })
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
