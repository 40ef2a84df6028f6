//! Collector factory: declaration -> unregistered [`CollectorHandle`].

use std::sync::Arc;

use rpcmetrics_core::error::{MetricsError, Result};
use rpcmetrics_core::protocol::{CollectorSpec, CollectorType, Declaration, Objective};

use super::{Collector, CollectorHandle, Counter, Desc, Gauge, Histogram, MetricVec, Summary};

/// Default histogram buckets, tuned for request latencies in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub fn create_declared(decl: &Declaration) -> Result<CollectorHandle> {
    create(&decl.name, &decl.collector)
}

/// Build a collector for `name` from `spec`.
///
/// Empty `labels` gives a scalar collector, otherwise a label vector.
pub fn create(name: &str, spec: &CollectorSpec) -> Result<CollectorHandle> {
    let kind = spec.collector_type(name)?;
    let desc = Desc::new(name, spec);
    let labels = spec.labels.clone();
    let vector = !labels.is_empty();

    if kind != CollectorType::Histogram && !spec.buckets.is_empty() {
        tracing::debug!(name = %name, kind = %kind, "buckets ignored for non-histogram collector");
    }
    if kind != CollectorType::Summary && !spec.objectives.is_empty() {
        tracing::debug!(name = %name, kind = %kind, "objectives ignored for non-summary collector");
    }

    let collector = match kind {
        CollectorType::Counter if vector => Collector::CounterVec(MetricVec::new(labels, Counter::new)),
        CollectorType::Counter => Collector::Counter(Counter::new()),
        CollectorType::Gauge if vector => Collector::GaugeVec(MetricVec::new(labels, Gauge::new)),
        CollectorType::Gauge => Collector::Gauge(Gauge::new()),
        CollectorType::Histogram => {
            let bounds = histogram_buckets(name, &spec.buckets)?;
            if vector {
                Collector::HistogramVec(MetricVec::new(labels, move || {
                    Histogram::new(Arc::clone(&bounds))
                }))
            } else {
                Collector::Histogram(Histogram::new(bounds))
            }
        }
        CollectorType::Summary => {
            let objectives = summary_objectives(name, &spec.objectives)?;
            if vector {
                Collector::SummaryVec(MetricVec::new(labels, move || {
                    Summary::new(Arc::clone(&objectives))
                }))
            } else {
                Collector::Summary(Summary::new(objectives))
            }
        }
    };

    Ok(CollectorHandle::new(desc, collector))
}

fn histogram_buckets(name: &str, raw: &[f64]) -> Result<Arc<[f64]>> {
    if raw.is_empty() {
        return Ok(Arc::from(DEFAULT_BUCKETS.as_slice()));
    }

    // A trailing +Inf is implicit in every histogram.
    let bounds = match raw.split_last() {
        Some((last, rest)) if *last == f64::INFINITY => rest,
        _ => raw,
    };

    if bounds.iter().any(|b| !b.is_finite()) {
        return Err(invalid(name, "histogram buckets must be finite"));
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid(name, "histogram buckets must be in strictly increasing order"));
    }
    Ok(Arc::from(bounds))
}

fn summary_objectives(name: &str, raw: &[Objective]) -> Result<Arc<[Objective]>> {
    for o in raw {
        if !(0.0..=1.0).contains(&o.quantile) {
            return Err(invalid(
                name,
                &format!("summary quantile {} must be within [0, 1]", o.quantile),
            ));
        }
        if !(0.0..1.0).contains(&o.error) {
            return Err(invalid(
                name,
                &format!("summary objective error {} must be within [0, 1)", o.error),
            ));
        }
    }
    if raw.windows(2).any(|w| w[0].quantile == w[1].quantile) {
        return Err(invalid(name, "duplicate summary quantile"));
    }
    Ok(Arc::from(raw))
}

fn invalid(name: &str, reason: &str) -> MetricsError {
    MetricsError::InvalidDeclaration {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
