//! Registry of declared collectors.
//!
//! Concurrent map from registry entry key to [`CollectorHandle`]. Reads and
//! non-conflicting writes go straight to the `DashMap`; callers that must not
//! race on the same key (declare/unregister) serialize themselves.

pub mod key;

use std::sync::Arc;

use dashmap::DashMap;

use crate::collector::CollectorHandle;

pub use key::{composite_key, resolve, resolve_and_remove, KEY_SEPARATOR};

#[derive(Default)]
pub struct Registry {
    entries: DashMap<String, Arc<CollectorHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn store(&self, key: String, handle: Arc<CollectorHandle>) {
        self.entries.insert(key, handle);
    }

    pub fn load(&self, key: &str) -> Option<Arc<CollectorHandle>> {
        self.entries.get(key).map(|r| Arc::clone(r.value()))
    }

    pub fn load_and_delete(&self, key: &str) -> Option<Arc<CollectorHandle>> {
        self.entries.remove(key).map(|(_, handle)| handle)
    }

    /// Visit every entry until `f` returns false.
    ///
    /// Entries are snapshotted first so `f` may call back into the registry.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Arc<CollectorHandle>) -> bool,
    {
        let snapshot: Vec<(String, Arc<CollectorHandle>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        for (k, v) in &snapshot {
            if !f(k, v) {
                break;
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
