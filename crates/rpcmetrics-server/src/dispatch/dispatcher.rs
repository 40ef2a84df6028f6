use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use rpcmetrics_core::error::{MetricsError, Result};
use rpcmetrics_core::protocol::{Declaration, Metric, Operation};

use crate::collector::{self, Collector, CollectorHandle, MetricVec};
use crate::config::RedeclarePolicy;
use crate::registry::{self, Registry};
use crate::sink::ExpositionSink;

/// Executes the metrics RPC protocol against a registry and an exposition sink.
///
/// Declare, Unregister and the startup bulk registration are serialized by a
/// single exclusive section. Mutations only read the registry and update the
/// collector in place.
pub struct Dispatcher {
    registry: Arc<Registry>,
    sink: Arc<dyn ExpositionSink>,
    policy: RedeclarePolicy,
    declare: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        sink: Arc<dyn ExpositionSink>,
        policy: RedeclarePolicy,
    ) -> Self {
        Self {
            registry,
            sink,
            policy,
            declare: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn policy(&self) -> RedeclarePolicy {
        self.policy
    }

    /// Create, register and store a new collector.
    pub fn declare(&self, decl: &Declaration) -> Result<()> {
        let _guard = self.lock();
        let name = decl.name.as_str();
        let namespace = decl.collector.namespace.as_str();

        tracing::debug!(name = %name, namespace = %namespace, kind = %decl.collector.kind, "declaring new metric");

        if registry::resolve(&self.registry, name, namespace).is_some() {
            return match self.policy {
                RedeclarePolicy::Idempotent => {
                    tracing::debug!(name = %name, namespace = %namespace, "metric already declared, keeping existing collector");
                    Ok(())
                }
                RedeclarePolicy::Strict => {
                    tracing::error!(name = %name, namespace = %namespace, "metric with provided name already exist");
                    Err(MetricsError::AlreadyExists {
                        name: name.to_string(),
                        namespace: namespace.to_string(),
                    })
                }
            };
        }

        let handle = Arc::new(collector::create_declared(decl)?);
        self.register_guarded(&handle)?;

        self.registry
            .store(registry::composite_key(name, namespace), handle);

        tracing::debug!(name = %name, namespace = %namespace, "metric successfully declared");
        Ok(())
    }

    /// Remove a collector addressed by its bare name (or `name@`).
    pub fn unregister(&self, name: &str) -> Result<()> {
        self.unregister_in(name, "")
    }

    /// Remove a collector, then take it back from the sink.
    ///
    /// If the sink refuses removal the registry entry is already gone and the
    /// call still succeeds; the sink keeps a dangling collector until restart.
    pub fn unregister_in(&self, name: &str, namespace: &str) -> Result<()> {
        let _guard = self.lock();

        tracing::debug!(name = %name, namespace = %namespace, "unregistering collector");

        let handle = registry::resolve_and_remove(&self.registry, name, namespace).ok_or_else(|| {
            MetricsError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            }
        })?;

        if !handle.is_registered() {
            tracing::debug!(name = %name, namespace = %namespace, "collector was never registered with the sink");
            return Ok(());
        }

        if self.sink.unregister(&handle) {
            handle.mark_unregistered();
            tracing::debug!(name = %name, namespace = %namespace, "collector was successfully unregistered");
        } else {
            tracing::warn!(
                name = %name,
                namespace = %namespace,
                fq_name = %handle.desc().fq_name,
                "collector was deleted from the registry but not from the exposition sink"
            );
        }
        Ok(())
    }

    pub fn add(&self, m: &Metric) -> Result<()> {
        self.mutate(Operation::Add, m)
    }

    pub fn sub(&self, m: &Metric) -> Result<()> {
        self.mutate(Operation::Sub, m)
    }

    pub fn set(&self, m: &Metric) -> Result<()> {
        self.mutate(Operation::Set, m)
    }

    pub fn observe(&self, m: &Metric) -> Result<()> {
        self.mutate(Operation::Observe, m)
    }

    /// Resolve the collector and apply `op` if its type/shape supports it.
    pub fn mutate(&self, op: Operation, m: &Metric) -> Result<()> {
        if m.namespace.is_empty() {
            tracing::trace!(name = %m.name, op = %op, "namespace is missing");
        }
        tracing::debug!(name = %m.name, namespace = %m.namespace, op = %op, value = m.value, labels = ?m.labels, "applying metric operation");

        let handle = registry::resolve(&self.registry, &m.name, &m.namespace).ok_or_else(|| {
            tracing::error!(name = %m.name, namespace = %m.namespace, op = %op, "undefined collector");
            MetricsError::NotFound {
                name: m.name.clone(),
                namespace: m.namespace.clone(),
            }
        })?;

        apply(&handle, op, m).map_err(|e| {
            tracing::error!(name = %m.name, namespace = %m.namespace, op = %op, error = %e, "metric operation failed");
            e
        })?;

        tracing::debug!(name = %m.name, namespace = %m.namespace, op = %op, "metric operation finished successfully");
        Ok(())
    }

    /// Register every stored collector not yet handed to the sink.
    ///
    /// Stops at the first failure. Returns how many collectors were registered.
    pub fn register_pending(&self) -> Result<usize> {
        let _guard = self.lock();

        let mut pending = Vec::new();
        self.registry.range(|_, handle| {
            if !handle.is_registered() {
                pending.push(Arc::clone(handle));
            }
            true
        });

        for handle in &pending {
            self.register_guarded(handle)?;
            tracing::debug!(name = %handle.desc().name, fq_name = %handle.desc().fq_name, "collector registered");
        }
        Ok(pending.len())
    }

    /// Hand a collector that lives outside the registry straight to the sink.
    ///
    /// Such collectors are scraped but cannot be reached by the mutation RPCs.
    pub fn register_collector(&self, handle: &Arc<CollectorHandle>) -> Result<()> {
        let _guard = self.lock();
        self.register_guarded(handle)?;
        tracing::debug!(fq_name = %handle.desc().fq_name, "external collector registered");
        Ok(())
    }

    // The sink may panic on invariant violations; that must not escape as a
    // crash, and nothing is stored when it happens.
    fn register_guarded(&self, handle: &Arc<CollectorHandle>) -> Result<()> {
        let desc = handle.desc();
        let sink = Arc::clone(&self.sink);
        let candidate = Arc::clone(handle);

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || sink.register(candidate)));
        let reason = match outcome {
            Ok(Ok(())) => {
                handle.mark_registered();
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("sink panicked: {}", panic_message(payload.as_ref())),
        };

        tracing::error!(name = %desc.name, namespace = %desc.namespace, reason = %reason, "exposition sink rejected collector");
        Err(MetricsError::RegistrationFailure {
            name: desc.name.clone(),
            namespace: desc.namespace.clone(),
            reason,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.declare.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Capability table: (collector type × shape) × operation.
fn apply(handle: &CollectorHandle, op: Operation, m: &Metric) -> Result<()> {
    match (handle.collector(), op) {
        (Collector::Counter(c), Operation::Add) => {
            no_labels(m)?;
            check_counter_value(m, op)?;
            c.inc_by(m.value);
        }
        (Collector::CounterVec(vec), Operation::Add) => {
            check_counter_value(m, op)?;
            child(vec, m)?.inc_by(m.value);
        }
        (Collector::Gauge(g), Operation::Add | Operation::Sub | Operation::Set) => {
            no_labels(m)?;
            match op {
                Operation::Add => g.add(m.value),
                Operation::Sub => g.sub(m.value),
                _ => g.set(m.value),
            }
        }
        (Collector::GaugeVec(vec), Operation::Add | Operation::Sub | Operation::Set) => {
            let g = child(vec, m)?;
            match op {
                Operation::Add => g.add(m.value),
                Operation::Sub => g.sub(m.value),
                _ => g.set(m.value),
            }
        }
        (Collector::Histogram(h), Operation::Observe) => {
            no_labels(m)?;
            h.observe(m.value);
        }
        (Collector::HistogramVec(vec), Operation::Observe) => child(vec, m)?.observe(m.value),
        (Collector::Summary(s), Operation::Observe) => {
            no_labels(m)?;
            s.observe(m.value);
        }
        (Collector::SummaryVec(vec), Operation::Observe) => child(vec, m)?.observe(m.value),
        _ => {
            return Err(MetricsError::UnsupportedOperation {
                name: m.name.clone(),
                namespace: m.namespace.clone(),
                op,
            })
        }
    }
    Ok(())
}

fn child<T>(vec: &MetricVec<T>, m: &Metric) -> Result<Arc<T>> {
    let expected = vec.label_names().len();
    if m.labels.is_empty() || m.labels.len() != expected {
        return Err(MetricsError::MissingLabels {
            name: m.name.clone(),
            namespace: m.namespace.clone(),
            expected,
            got: m.labels.len(),
        });
    }
    Ok(vec.with_label_values(&m.labels))
}

/// Scalar collectors take no label values.
fn no_labels(m: &Metric) -> Result<()> {
    if m.labels.is_empty() {
        return Ok(());
    }
    Err(MetricsError::MissingLabels {
        name: m.name.clone(),
        namespace: m.namespace.clone(),
        expected: 0,
        got: m.labels.len(),
    })
}

fn check_counter_value(m: &Metric, op: Operation) -> Result<()> {
    if m.value < 0.0 || m.value.is_nan() {
        return Err(MetricsError::InvalidValue {
            name: m.name.clone(),
            namespace: m.namespace.clone(),
            op,
            value: m.value,
        });
    }
    Ok(())
}
