//! Registry key resolution.
//!
//! Two addressing generations coexist:
//! - legacy: the bare collector name (static config, pre-namespace clients)
//! - composite: `name@namespace` (everything declared over RPC)
//!
//! Lookups always try the legacy key first, then the composite key.

use std::sync::Arc;

use crate::collector::CollectorHandle;

use super::Registry;

pub const KEY_SEPARATOR: char = '@';

pub fn composite_key(name: &str, namespace: &str) -> String {
    let mut key = String::with_capacity(name.len() + namespace.len() + 1);
    key.push_str(name);
    key.push(KEY_SEPARATOR);
    key.push_str(namespace);
    key
}

/// Two-tier lookup: bare `name`, then `name@namespace`.
pub fn resolve(registry: &Registry, name: &str, namespace: &str) -> Option<Arc<CollectorHandle>> {
    registry
        .load(name)
        .or_else(|| registry.load(&composite_key(name, namespace)))
}

/// Same lookup order as [`resolve`], removing the entry that was hit.
pub fn resolve_and_remove(
    registry: &Registry,
    name: &str,
    namespace: &str,
) -> Option<Arc<CollectorHandle>> {
    registry
        .load_and_delete(name)
        .or_else(|| registry.load_and_delete(&composite_key(name, namespace)))
}
