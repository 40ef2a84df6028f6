//! Process collector: resident/virtual memory, CPU time and start time of
//! the running process, read through `sysinfo`.
//!
//! Values are refreshed on construction and then periodically by a background
//! task (see [`ProcessCollector::spawn_updater`]), not at scrape time.

use std::sync::{Arc, Mutex};

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use rpcmetrics_core::error::Result;
use rpcmetrics_core::protocol::CollectorSpec;

use crate::collector::{self, Collector, CollectorHandle};
use crate::provider::StatProvider;

/// Refresh period of the background updater.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(15);

pub struct ProcessCollector {
    system: Mutex<System>,
    pid: Pid,
    resident_memory: Arc<CollectorHandle>,
    virtual_memory: Arc<CollectorHandle>,
    cpu_seconds: Arc<CollectorHandle>,
    start_time: Arc<CollectorHandle>,
}

fn handle(name: &str, kind: &str, help: &str) -> Result<Arc<CollectorHandle>> {
    let spec = CollectorSpec {
        namespace: "process".into(),
        kind: kind.into(),
        help: help.into(),
        ..CollectorSpec::default()
    };
    Ok(Arc::new(collector::create(name, &spec)?))
}

impl ProcessCollector {
    pub fn new() -> Result<Self> {
        let collector = Self {
            system: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
            resident_memory: handle(
                "resident_memory_bytes",
                "gauge",
                "Resident memory size in bytes.",
            )?,
            virtual_memory: handle(
                "virtual_memory_bytes",
                "gauge",
                "Virtual memory size in bytes.",
            )?,
            cpu_seconds: handle(
                "cpu_seconds_total",
                "counter",
                "Total user and system CPU time spent in seconds.",
            )?,
            start_time: handle(
                "start_time_seconds",
                "gauge",
                "Start time of the process since unix epoch in seconds.",
            )?,
        };
        collector.refresh();
        Ok(collector)
    }

    /// Re-read the current process and update every collector.
    pub fn refresh(&self) {
        let mut sys = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("process metrics mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let Some(process) = sys.process(self.pid) else {
            tracing::debug!(pid = %self.pid, "current process not visible to sysinfo");
            return;
        };

        set_gauge(&self.resident_memory, process.memory() as f64);
        set_gauge(&self.virtual_memory, process.virtual_memory() as f64);
        set_gauge(&self.start_time, process.start_time() as f64);

        // accumulated in milliseconds
        let cpu = process.accumulated_cpu_time() as f64 / 1000.0;
        if let Collector::Counter(c) = self.cpu_seconds.collector() {
            let delta = cpu - c.get();
            if delta > 0.0 {
                c.inc_by(delta);
            }
        }
    }

    /// Spawn a task refreshing the collectors every [`UPDATE_INTERVAL`].
    pub fn spawn_updater(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(UPDATE_INTERVAL);
            loop {
                ticker.tick().await;
                self.refresh();
            }
        })
    }
}

fn set_gauge(handle: &CollectorHandle, v: f64) {
    if let Collector::Gauge(g) = handle.collector() {
        g.set(v);
    }
}

impl StatProvider for ProcessCollector {
    fn metrics_collectors(&self) -> Vec<Arc<CollectorHandle>> {
        vec![
            Arc::clone(&self.resident_memory),
            Arc::clone(&self.virtual_memory),
            Arc::clone(&self.cpu_seconds),
            Arc::clone(&self.start_time),
        ]
    }
}
