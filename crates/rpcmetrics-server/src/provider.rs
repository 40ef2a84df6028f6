//! In-process metric providers.

use std::sync::Arc;

use crate::collector::CollectorHandle;

/// A component exposing its own collectors.
///
/// Provider collectors are registered with the exposition sink when the
/// server starts serving. They are read-only from the RPC side: nothing is
/// stored in the registry for them.
pub trait StatProvider: Send + Sync {
    fn metrics_collectors(&self) -> Vec<Arc<CollectorHandle>>;
}
