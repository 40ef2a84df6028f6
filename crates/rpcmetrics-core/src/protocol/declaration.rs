//! Collector declarations.
//!
//! A declaration is the shape shared by the `Declare` RPC and the static
//! `metrics.collect` config section: the collector name plus a
//! [`CollectorSpec`] describing type, naming and label dimensions.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{MetricsError, Result};

/// Collector types understood by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl CollectorType {
    /// Parse the raw type tag of a declaration.
    ///
    /// `name` is only used to give the error some context.
    pub fn parse(name: &str, tag: &str) -> Result<Self> {
        match tag {
            "counter" => Ok(CollectorType::Counter),
            "gauge" => Ok(CollectorType::Gauge),
            "histogram" => Ok(CollectorType::Histogram),
            "summary" => Ok(CollectorType::Summary),
            other => Err(MetricsError::InvalidType {
                name: name.to_string(),
                ty: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectorType::Counter => "counter",
            CollectorType::Gauge => "gauge",
            CollectorType::Histogram => "histogram",
            CollectorType::Summary => "summary",
        }
    }
}

impl fmt::Display for CollectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary objective: target quantile and its allowed absolute error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub quantile: f64,
    pub error: f64,
}

/// Collector definition (everything but the name).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorSpec {
    /// Namespace of the metric (may be empty).
    #[serde(default)]
    pub namespace: String,
    /// Subsystem of the metric.
    #[serde(default)]
    pub subsystem: String,
    /// Raw type tag (`counter`, `gauge`, `histogram`, `summary`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Help text.
    #[serde(default)]
    pub help: String,
    /// Label names; non-empty makes the collector a vector.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Histogram bucket upper bounds (default set when empty).
    #[serde(default)]
    pub buckets: Vec<f64>,
    /// Summary objectives, sorted by quantile.
    #[serde(default, deserialize_with = "deserialize_objectives")]
    pub objectives: Vec<Objective>,
}

impl CollectorSpec {
    /// Parsed collector type.
    pub fn collector_type(&self, name: &str) -> Result<CollectorType> {
        CollectorType::parse(name, &self.kind)
    }
}

/// `Declare` request body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    /// Collector name.
    pub name: String,
    /// Collector structure.
    pub collector: CollectorSpec,
}

// Objectives arrive as a map keyed by quantile. JSON keys are strings
// ("0.5"), YAML keys are plain floats; both are accepted.
fn deserialize_objectives<'de, D>(d: D) -> std::result::Result<Vec<Objective>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum QuantileKey {
        Num(f64),
        Text(String),
    }

    struct ObjectivesVisitor;

    impl<'de> Visitor<'de> for ObjectivesVisitor {
        type Value = Vec<Objective>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of quantile to absolute error")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, error)) = map.next_entry::<QuantileKey, f64>()? {
                let quantile = match key {
                    QuantileKey::Num(q) => q,
                    QuantileKey::Text(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| de::Error::custom(format!("invalid quantile: {s}")))?,
                };
                out.push(Objective { quantile, error });
            }
            out.sort_by(|a, b| a.quantile.total_cmp(&b.quantile));
            Ok(out)
        }
    }

    d.deserialize_any(ObjectivesVisitor)
}
