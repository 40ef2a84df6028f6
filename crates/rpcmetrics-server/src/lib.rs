//! rpcmetrics server library entry.
//!
//! This crate wires the collector factory, registry, exposition sink and
//! mutation dispatcher into a runnable service with an HTTP RPC surface and a
//! scrape endpoint. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod process;
pub mod provider;
pub mod registry;
pub mod router;
pub mod rpc;
pub mod sink;
