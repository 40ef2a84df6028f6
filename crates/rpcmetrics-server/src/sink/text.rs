//! In-process sink rendering the Prometheus text exposition layout.
//!
//! Collectors are keyed by fully-qualified name, so two declarations that
//! differ in registry key but flatten to the same `namespace_subsystem_name`
//! collide here and are refused.

use std::fmt::Write;
use std::sync::Arc;

use dashmap::DashMap;

use rpcmetrics_core::protocol::CollectorType;

use crate::collector::{Collector, CollectorHandle, HistogramSnapshot, SummarySnapshot};

use super::{ExpositionSink, SinkError};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `{k="v",...}` with an optional trailing pair (`le`, `quantile`).
fn label_set(names: &[String], values: &[String], extra: Option<(&str, &str)>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values.iter())
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some((k, v)) = extra {
        pairs.push(format!("{}=\"{}\"", k, escape_label(v)));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

#[derive(Default)]
pub struct TextSink {
    collectors: DashMap<String, Arc<CollectorHandle>>,
}

impl TextSink {
    pub fn new() -> Self {
        Self {
            collectors: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn contains(&self, fq_name: &str) -> bool {
        self.collectors.contains_key(fq_name)
    }

    fn validate(handle: &CollectorHandle) -> std::result::Result<(), SinkError> {
        let desc = handle.desc();
        if !valid_metric_name(&desc.fq_name) {
            return Err(SinkError::InvalidName(desc.fq_name.clone()));
        }
        let reserved_label = match handle.kind() {
            CollectorType::Histogram => Some("le"),
            CollectorType::Summary => Some("quantile"),
            CollectorType::Counter | CollectorType::Gauge => None,
        };
        for (i, label) in desc.label_names.iter().enumerate() {
            let reserved = reserved_label == Some(label.as_str());
            let duplicate = desc.label_names[..i].contains(label);
            if !valid_label_name(label) || reserved || duplicate {
                return Err(SinkError::InvalidLabelName {
                    metric: desc.fq_name.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }

    /// Render all registered collectors, sorted by name.
    pub fn render(&self) -> String {
        let mut handles: Vec<Arc<CollectorHandle>> = self
            .collectors
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        handles.sort_by(|a, b| a.desc().fq_name.cmp(&b.desc().fq_name));

        let mut out = String::new();
        for h in &handles {
            render_collector(h, &mut out);
        }
        out
    }
}

impl ExpositionSink for TextSink {
    fn register(&self, handle: Arc<CollectorHandle>) -> std::result::Result<(), SinkError> {
        Self::validate(&handle)?;
        let desc = handle.desc();

        match self.collectors.entry(desc.fq_name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(SinkError::AlreadyRegistered(desc.fq_name.clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    fn unregister(&self, handle: &CollectorHandle) -> bool {
        self.collectors
            .remove_if(&handle.desc().fq_name, |_, held| {
                std::ptr::eq(Arc::as_ptr(held), handle)
            })
            .is_some()
    }
}

fn render_collector(h: &CollectorHandle, out: &mut String) {
    let desc = h.desc();
    let name = desc.fq_name.as_str();
    let labels = desc.label_names.as_slice();

    if !desc.help.is_empty() {
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(&desc.help));
    }
    let _ = writeln!(out, "# TYPE {} {}", name, h.kind());

    match h.collector() {
        Collector::Counter(c) => render_value(name, "", c.get(), out),
        Collector::Gauge(g) => render_value(name, "", g.get(), out),
        Collector::Histogram(hist) => render_histogram(name, labels, &[], &hist.snapshot(), out),
        Collector::Summary(s) => render_summary(name, labels, &[], &s.snapshot(), out),
        Collector::CounterVec(v) => {
            for (values, c) in v.children() {
                render_value(name, &label_set(labels, &values, None), c.get(), out);
            }
        }
        Collector::GaugeVec(v) => {
            for (values, g) in v.children() {
                render_value(name, &label_set(labels, &values, None), g.get(), out);
            }
        }
        Collector::HistogramVec(v) => {
            for (values, hist) in v.children() {
                render_histogram(name, labels, &values, &hist.snapshot(), out);
            }
        }
        Collector::SummaryVec(v) => {
            for (values, s) in v.children() {
                render_summary(name, labels, &values, &s.snapshot(), out);
            }
        }
    }
}

fn render_value(name: &str, label_str: &str, v: f64, out: &mut String) {
    let _ = writeln!(out, "{}{} {}", name, label_str, fmt_value(v));
}

fn render_histogram(
    name: &str,
    labels: &[String],
    values: &[String],
    snap: &HistogramSnapshot,
    out: &mut String,
) {
    for (le, count) in &snap.buckets {
        let set = label_set(labels, values, Some(("le", &fmt_value(*le))));
        let _ = writeln!(out, "{}_bucket{} {}", name, set, count);
    }
    let set = label_set(labels, values, Some(("le", "+Inf")));
    let _ = writeln!(out, "{}_bucket{} {}", name, set, snap.count);

    let set = label_set(labels, values, None);
    let _ = writeln!(out, "{}_sum{} {}", name, set, fmt_value(snap.sum));
    let _ = writeln!(out, "{}_count{} {}", name, set, snap.count);
}

fn render_summary(
    name: &str,
    labels: &[String],
    values: &[String],
    snap: &SummarySnapshot,
    out: &mut String,
) {
    for (q, v) in &snap.quantiles {
        let set = label_set(labels, values, Some(("quantile", &fmt_value(*q))));
        let _ = writeln!(out, "{}{} {}", name, set, fmt_value(*v));
    }
    let set = label_set(labels, values, None);
    let _ = writeln!(out, "{}_sum{} {}", name, set, fmt_value(snap.sum));
    let _ = writeln!(out, "{}_count{} {}", name, set, snap.count);
}

#[cfg(test)]
mod tests {
    use rpcmetrics_core::protocol::CollectorSpec;

    use super::*;
    use crate::collector;

    fn handle(name: &str, namespace: &str, kind: &str, labels: &[&str]) -> Arc<CollectorHandle> {
        let spec = CollectorSpec {
            namespace: namespace.to_string(),
            kind: kind.to_string(),
            help: format!("{name} help"),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            ..CollectorSpec::default()
        };
        Arc::new(collector::create(name, &spec).unwrap())
    }

    #[test]
    fn same_fq_name_collides() {
        let sink = TextSink::new();
        sink.register(handle("b_total", "a", "counter", &[])).unwrap();
        let err = sink
            .register(handle("a_b_total", "", "counter", &[]))
            .unwrap_err();
        assert_eq!(err, SinkError::AlreadyRegistered("a_b_total".into()));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn invalid_names_are_refused() {
        let sink = TextSink::new();
        assert!(matches!(
            sink.register(handle("bad-name", "", "gauge", &[])),
            Err(SinkError::InvalidName(_))
        ));
        assert!(matches!(
            sink.register(handle("h", "", "histogram", &["le"])),
            Err(SinkError::InvalidLabelName { .. })
        ));
        assert!(matches!(
            sink.register(handle("g", "", "gauge", &["a", "a"])),
            Err(SinkError::InvalidLabelName { .. })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn reserved_labels_depend_on_type() {
        let sink = TextSink::new();
        sink.register(handle("g", "", "gauge", &["le"])).unwrap();
        sink.register(handle("c", "", "counter", &["quantile"])).unwrap();
        sink.register(handle("h", "", "histogram", &["quantile"])).unwrap();
        sink.register(handle("s", "", "summary", &["le"])).unwrap();

        assert!(matches!(
            sink.register(handle("h2", "", "histogram", &["le"])),
            Err(SinkError::InvalidLabelName { .. })
        ));
        assert!(matches!(
            sink.register(handle("s2", "", "summary", &["quantile"])),
            Err(SinkError::InvalidLabelName { .. })
        ));
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn unregister_only_removes_the_same_instance() {
        let sink = TextSink::new();
        let held = handle("x", "", "counter", &[]);
        let twin = handle("x", "", "counter", &[]);
        sink.register(Arc::clone(&held)).unwrap();

        assert!(!sink.unregister(&twin));
        assert!(sink.contains("x"));
        assert!(sink.unregister(&held));
        assert!(!sink.contains("x"));
        assert!(!sink.unregister(&held));
    }

    #[test]
    fn renders_counter_and_gauge_vec() {
        let sink = TextSink::new();
        let c = handle("requests_total", "app", "counter", &[]);
        let g = handle("pool", "app", "gauge", &["state"]);
        sink.register(Arc::clone(&c)).unwrap();
        sink.register(Arc::clone(&g)).unwrap();

        if let Collector::Counter(c) = c.collector() {
            c.inc_by(3.0);
        }
        if let Collector::GaugeVec(v) = g.collector() {
            v.with_label_values(&["idle".to_string()]).set(2.0);
            v.with_label_values(&["busy".to_string()]).set(1.5);
        }

        let text = sink.render();
        assert!(text.contains("# HELP app_requests_total requests_total help\n"));
        assert!(text.contains("# TYPE app_requests_total counter\n"));
        assert!(text.contains("app_requests_total 3\n"));
        assert!(text.contains("# TYPE app_pool gauge\n"));
        assert!(text.contains("app_pool{state=\"busy\"} 1.5\n"));
        assert!(text.contains("app_pool{state=\"idle\"} 2\n"));
        // Sorted by name: app_pool before app_requests_total.
        assert!(text.find("app_pool").unwrap() < text.find("app_requests_total").unwrap());
    }

    #[test]
    fn renders_histogram_series() {
        let sink = TextSink::new();
        let h = handle("latency", "", "histogram", &[]);
        sink.register(Arc::clone(&h)).unwrap();
        if let Collector::Histogram(hist) = h.collector() {
            hist.observe(0.2);
            hist.observe(20.0);
        }

        let text = sink.render();
        assert!(text.contains("latency_bucket{le=\"0.1\"} 0\n"));
        assert!(text.contains("latency_bucket{le=\"0.25\"} 1\n"));
        assert!(text.contains("latency_bucket{le=\"10\"} 1\n"));
        assert!(text.contains("latency_bucket{le=\"+Inf\"} 2\n"));
        assert!(text.contains("latency_sum 20.2\n"));
        assert!(text.contains("latency_count 2\n"));
    }

    #[test]
    fn escapes_label_values() {
        assert_eq!(
            label_set(&["k".to_string()], &["a\"b\\c\nd".to_string()], None),
            "{k=\"a\\\"b\\\\c\\nd\"}"
        );
        assert_eq!(label_set(&[], &[], None), "");
    }
}
