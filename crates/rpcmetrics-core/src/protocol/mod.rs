//! Protocol modules (declarations + mutations).
//!
//! This module hosts the request shapes carried by the RPC surface:
//! - Declarations: named collector definitions (also the static config shape).
//! - Mutations: value updates addressed by name, namespace and label values.
//!
//! Decoding never trusts the collector type tag; it is kept as the raw string
//! and validated by the collector factory so an unknown tag reports
//! `InvalidType` instead of a generic parse failure.

pub mod declaration;
pub mod metric;

pub use declaration::{CollectorSpec, CollectorType, Declaration, Objective};
pub use metric::{Ack, Metric, Operation, UnregisterRequest};
