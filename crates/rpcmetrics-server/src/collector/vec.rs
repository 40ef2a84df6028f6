//! Label-partitioned collectors.
//!
//! A `MetricVec` maps each label-value tuple to an independent child collector,
//! creating children on first use. Tuples are kept in declaration order (not
//! sorted) since the label names are fixed at declare time.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

pub struct MetricVec<T> {
    label_names: Vec<String>,
    children: DashMap<Vec<String>, Arc<T>>,
    make: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> MetricVec<T> {
    pub fn new(label_names: Vec<String>, make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            label_names,
            children: DashMap::new(),
            make: Box::new(make),
        }
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Child for `values`, created on first use.
    ///
    /// The caller checks that `values.len()` matches the label cardinality.
    pub fn with_label_values(&self, values: &[String]) -> Arc<T> {
        if let Some(child) = self.children.get(values) {
            return Arc::clone(child.value());
        }
        self.children
            .entry(values.to_vec())
            .or_insert_with(|| Arc::new((self.make)()))
            .value()
            .clone()
    }

    /// Existing child for `values`, without creating one.
    pub fn get<S: AsRef<str>>(&self, values: &[S]) -> Option<Arc<T>> {
        let key: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        self.children.get(&key).map(|c| Arc::clone(c.value()))
    }

    /// All children sorted by label values, for deterministic exposition.
    pub fn children(&self) -> Vec<(Vec<String>, Arc<T>)> {
        let mut out: Vec<_> = self
            .children
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<T> fmt::Debug for MetricVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricVec")
            .field("label_names", &self.label_names)
            .field("children", &self.children.len())
            .finish()
    }
}
