use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;

use rpcmetrics_core::error::{MetricsError, Result};
use rpcmetrics_core::protocol::CollectorSpec;

use crate::collector;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub rpc: RpcSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion);
        }

        self.metrics.validate()?;
        self.rpc.validate()?;

        Ok(())
    }
}

/// What `Declare` does when the collector already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeclarePolicy {
    /// Fail with `AlreadyExists`.
    #[default]
    Strict,
    /// Succeed without touching the existing collector.
    Idempotent,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Scrape endpoint address.
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default)]
    pub redeclare: RedeclarePolicy,

    /// Application collectors declared at startup, keyed by name.
    #[serde(default)]
    pub collect: BTreeMap<String, CollectorSpec>,

    /// Export `process_*` collectors for this process.
    #[serde(default = "default_true")]
    pub process_collector: bool,

    /// Per-request deadline on the scrape endpoint.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            redeclare: RedeclarePolicy::default(),
            collect: BTreeMap::new(),
            process_collector: true,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        parse_addr("metrics.address", &self.address)?;
        positive("metrics.request_timeout_secs", self.request_timeout_secs)?;

        // Same checks the factory runs at startup, surfaced at load time.
        for (name, spec) in &self.collect {
            collector::create(name, spec)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcSection {
    #[serde(default = "default_rpc_listen")]
    pub listen: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on a request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            listen: default_rpc_listen(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl RpcSection {
    pub fn validate(&self) -> Result<()> {
        parse_addr("rpc.listen", &self.listen)?;
        positive("rpc.request_timeout_secs", self.request_timeout_secs)?;
        positive("rpc.max_body_bytes", self.max_body_bytes as u64)?;
        Ok(())
    }
}

pub fn parse_addr(field: &str, s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|_| MetricsError::BadRequest(format!("{field} must be a valid SocketAddr: {s}")))
}

fn positive(field: &str, v: u64) -> Result<()> {
    if v == 0 {
        return Err(MetricsError::BadRequest(format!("{field} must be > 0")));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_max_body_bytes() -> usize {
    1 << 20
}
fn default_address() -> String {
    "127.0.0.1:2112".into()
}
fn default_rpc_listen() -> String {
    "127.0.0.1:6001".into()
}
