//! Shared application state for the rpcmetrics server.
//!
//! Builds the registry, exposition sink and dispatcher from config, and owns
//! the one-time bulk registration pass run before serving.

use std::sync::{Arc, Mutex};

use rpcmetrics_core::error::Result;

use crate::collector::{self, CollectorHandle};
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::process::ProcessCollector;
use crate::provider::StatProvider;
use crate::registry::Registry;
use crate::sink::TextSink;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<ServerConfig>,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<TextSink>,
    process: Option<Arc<ProcessCollector>>,
    providers: Arc<Mutex<Vec<Arc<dyn StatProvider>>>>,
}

impl AppState {
    /// Build application state.
    ///
    /// Collectors from `metrics.collect` are instantiated and stored under
    /// their bare name, un-registered; see [`AppState::serve`]. The process
    /// collector, when enabled, is registered right away.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        for (name, spec) in &cfg.metrics.collect {
            let handle = collector::create(name, spec)?;
            registry.store(name.clone(), Arc::new(handle));
        }

        let sink = Arc::new(TextSink::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), sink.clone(), cfg.metrics.redeclare);

        let process = if cfg.metrics.process_collector {
            let process = Arc::new(ProcessCollector::new()?);
            for handle in process.metrics_collectors() {
                dispatcher.register_collector(&handle)?;
            }
            Some(process)
        } else {
            None
        };

        tracing::info!(
            collectors = registry.len(),
            redeclare = ?dispatcher.policy(),
            process_collector = process.is_some(),
            "metrics registry initialized"
        );

        Ok(Self {
            cfg: Arc::new(cfg),
            dispatcher: Arc::new(dispatcher),
            sink,
            process,
            providers: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Register a collector owned by another component. It is exposed on
    /// scrape but not addressable by the mutation RPCs.
    pub fn register_collector(&self, handle: Arc<CollectorHandle>) -> Result<()> {
        self.dispatcher.register_collector(&handle)
    }

    /// Queue a provider whose collectors are registered by [`AppState::serve`].
    pub fn add_stat_provider(&self, provider: Arc<dyn StatProvider>) {
        self.lock_providers().push(provider);
    }

    /// Register provider collectors, then every stored collector not yet
    /// handed to the sink. Stops at the first failure.
    pub fn serve(&self) -> Result<usize> {
        let providers: Vec<Arc<dyn StatProvider>> = self.lock_providers().drain(..).collect();

        let mut n = 0;
        for provider in &providers {
            for handle in provider.metrics_collectors() {
                self.dispatcher.register_collector(&handle)?;
                n += 1;
            }
        }
        n += self.dispatcher.register_pending()?;

        tracing::info!(registered = n, "static collectors registered");
        Ok(n)
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.cfg
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn sink(&self) -> Arc<TextSink> {
        Arc::clone(&self.sink)
    }

    pub fn process(&self) -> Option<Arc<ProcessCollector>> {
        self.process.clone()
    }

    fn lock_providers(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn StatProvider>>> {
        match self.providers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
