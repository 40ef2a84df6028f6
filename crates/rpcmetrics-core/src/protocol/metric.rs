//! Mutation requests (`Add`, `Sub`, `Set`, `Observe`) and acknowledgements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mutating operations a collector may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Sub,
    Set,
    Observe,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "Add",
            Operation::Sub => "Sub",
            Operation::Set => "Set",
            Operation::Observe => "Observe",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value update addressed to a declared collector.
///
/// Older clients send PascalCase keys (`Name`, `Value`, ...); both spellings
/// are accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metric {
    /// Collector name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Collector namespace.
    #[serde(default, alias = "Namespace")]
    pub namespace: String,
    /// Value to apply.
    #[serde(default, alias = "Value")]
    pub value: f64,
    /// Label values, in declaration order. Only for vector collectors.
    #[serde(default, alias = "Labels")]
    pub labels: Vec<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

/// `Unregister` request body.
///
/// `namespace` is optional; without it only collectors reachable by the bare
/// name (or declared with an empty namespace) can be removed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnregisterRequest {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Namespace")]
    pub namespace: String,
}

/// RPC acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}
