//! Exposition sink: the process-wide owner of registered collectors.
//!
//! The dispatcher hands collectors to the sink on declare and takes them back
//! on unregister; it never reads through the sink. Scraping goes the other
//! way: the `/metrics` handler asks the sink to render everything it owns.

pub mod text;

use std::sync::Arc;

use thiserror::Error;

use crate::collector::CollectorHandle;

pub use text::TextSink;

/// Registration refused by the sink.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("duplicate metrics collector registration attempted: {0}")]
    AlreadyRegistered(String),
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("invalid label name {label:?} for metric {metric}")]
    InvalidLabelName { metric: String, label: String },
}

/// Sink contract. Implementations enforce their own global naming rules,
/// independent of the registry's key scheme.
pub trait ExpositionSink: Send + Sync {
    fn register(&self, handle: Arc<CollectorHandle>) -> std::result::Result<(), SinkError>;

    /// Returns false if the sink does not hold exactly this collector.
    fn unregister(&self, handle: &CollectorHandle) -> bool;
}
