//! rpcmetrics core: the wire data model and error surface of the metrics RPC
//! protocol.
//!
//! This crate defines the declaration/mutation request shapes and the error
//! type shared by the server, its RPC handlers, and client tooling. It carries
//! no runtime or transport dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `MetricsError`/`Result` so a malformed
//! request never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{MetricsError, Result};
