//! Typed collectors and the handle the registry stores.
//!
//! A [`Collector`] is a tagged variant over (type × shape): counter, gauge,
//! histogram or summary, each either scalar or label-vector. Capability checks
//! in the dispatcher are a static `match` over this tag pair.

pub mod atomic;
pub mod factory;
pub mod scalar;
pub mod vec;

use std::sync::atomic::{AtomicBool, Ordering};

use rpcmetrics_core::protocol::{CollectorSpec, CollectorType};

pub use factory::{create, create_declared, DEFAULT_BUCKETS};
pub use scalar::{Counter, Gauge, Histogram, HistogramSnapshot, Summary, SummarySnapshot};
pub use vec::MetricVec;

/// Naming and label metadata of a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    pub name: String,
    pub namespace: String,
    pub subsystem: String,
    pub help: String,
    pub label_names: Vec<String>,
    /// `namespace_subsystem_name`, empty parts skipped.
    pub fq_name: String,
}

impl Desc {
    pub fn new(name: &str, spec: &CollectorSpec) -> Self {
        Self {
            name: name.to_string(),
            namespace: spec.namespace.clone(),
            subsystem: spec.subsystem.clone(),
            help: spec.help.clone(),
            label_names: spec.labels.clone(),
            fq_name: build_fq_name(&spec.namespace, &spec.subsystem, name),
        }
    }
}

/// Join the non-empty parts with `_`. An empty `name` yields an empty string.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    [namespace, subsystem, name]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Concrete collector, tagged by type and shape.
#[derive(Debug)]
pub enum Collector {
    Counter(Counter),
    CounterVec(MetricVec<Counter>),
    Gauge(Gauge),
    GaugeVec(MetricVec<Gauge>),
    Histogram(Histogram),
    HistogramVec(MetricVec<Histogram>),
    Summary(Summary),
    SummaryVec(MetricVec<Summary>),
}

impl Collector {
    pub fn kind(&self) -> CollectorType {
        match self {
            Collector::Counter(_) | Collector::CounterVec(_) => CollectorType::Counter,
            Collector::Gauge(_) | Collector::GaugeVec(_) => CollectorType::Gauge,
            Collector::Histogram(_) | Collector::HistogramVec(_) => CollectorType::Histogram,
            Collector::Summary(_) | Collector::SummaryVec(_) => CollectorType::Summary,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            Collector::CounterVec(_)
                | Collector::GaugeVec(_)
                | Collector::HistogramVec(_)
                | Collector::SummaryVec(_)
        )
    }

    /// Current value of a scalar counter or gauge.
    pub fn value(&self) -> Option<f64> {
        match self {
            Collector::Counter(c) => Some(c.get()),
            Collector::Gauge(g) => Some(g.get()),
            _ => None,
        }
    }

    /// Current value of an existing counter/gauge child.
    pub fn child_value<S: AsRef<str>>(&self, labels: &[S]) -> Option<f64> {
        match self {
            Collector::CounterVec(v) => v.get(labels).map(|c| c.get()),
            Collector::GaugeVec(v) => v.get(labels).map(|g| g.get()),
            _ => None,
        }
    }
}

/// Runtime object produced from a declaration.
///
/// `registered` flips to true once the exposition sink has accepted the
/// collector; config-declared collectors start unregistered until `serve`.
#[derive(Debug)]
pub struct CollectorHandle {
    desc: Desc,
    collector: Collector,
    registered: AtomicBool,
}

impl CollectorHandle {
    pub fn new(desc: Desc, collector: Collector) -> Self {
        Self {
            desc,
            collector,
            registered: AtomicBool::new(false),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn kind(&self) -> CollectorType {
        self.collector.kind()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn mark_registered(&self) {
        self.registered.store(true, Ordering::Release);
    }

    pub fn mark_unregistered(&self) {
        self.registered.store(false, Ordering::Release);
    }
}
