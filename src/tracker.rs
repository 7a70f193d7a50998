//! Facade bundling the tracker services over one store

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::export::ExportCoordinator;
use crate::lifecycle::ExecutionLifecycleManager;
use crate::measurement::MeasurementCollector;
use crate::sample::SampleTracker;
use crate::store::{ExecutionStore, MemoryStore};
use crate::Result;

/// Execution tracker instance.
///
/// Built once and shared; the services hold no per-request state, so cloning
/// only bumps reference counts.
#[derive(Debug)]
pub struct Tracker<R = MemoryStore> {
    store: Arc<R>,
    config: Arc<TrackerConfig>,
    executions: ExecutionLifecycleManager<R>,
    samples: SampleTracker<R>,
    measurements: MeasurementCollector<R>,
    exports: ExportCoordinator<R>,
}

impl<R> Clone for Tracker<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            executions: self.executions.clone(),
            samples: self.samples.clone(),
            measurements: self.measurements.clone(),
            exports: self.exports.clone(),
        }
    }
}

impl Tracker<MemoryStore> {
    /// Tracker over a fresh in-memory store with default settings.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Arc::new(TrackerConfig::default());
        Self::assemble(store, config)
    }
}

impl<R: ExecutionStore> Tracker<R> {
    /// Start building a tracker over `store`.
    #[must_use]
    pub fn builder(store: R) -> TrackerBuilder<R> {
        TrackerBuilder::new(store)
    }

    fn assemble(store: Arc<R>, config: Arc<TrackerConfig>) -> Self {
        Self {
            executions: ExecutionLifecycleManager::new(Arc::clone(&store), Arc::clone(&config)),
            samples: SampleTracker::new(Arc::clone(&store)),
            measurements: MeasurementCollector::new(Arc::clone(&store)),
            exports: ExportCoordinator::new(Arc::clone(&store), Arc::clone(&config)),
            store,
            config,
        }
    }

    /// Execution lifecycle operations.
    #[must_use]
    pub const fn executions(&self) -> &ExecutionLifecycleManager<R> {
        &self.executions
    }

    /// Sample lifecycle operations.
    #[must_use]
    pub const fn samples(&self) -> &SampleTracker<R> {
        &self.samples
    }

    /// Measurement ledger operations.
    #[must_use]
    pub const fn measurements(&self) -> &MeasurementCollector<R> {
        &self.measurements
    }

    /// Export job operations.
    #[must_use]
    pub const fn exports(&self) -> &ExportCoordinator<R> {
        &self.exports
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

/// Builder for [`Tracker`].
#[derive(Debug)]
pub struct TrackerBuilder<R> {
    store: R,
    config: TrackerConfig,
}

impl<R: ExecutionStore> TrackerBuilder<R> {
    /// Builder over `store` with default settings.
    #[must_use]
    pub fn new(store: R) -> Self {
        Self {
            store,
            config: TrackerConfig::default(),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the export lifetime in hours.
    #[must_use]
    pub const fn export_ttl_hours(mut self, hours: u32) -> Self {
        self.config.export_ttl_hours = hours;
        self
    }

    /// Set the default page size for listings.
    #[must_use]
    pub const fn default_page_size(mut self, size: u32) -> Self {
        self.config.default_page_size = size;
        self
    }

    /// Build the tracker.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the configuration is inconsistent.
    pub fn build(self) -> Result<Tracker<R>> {
        self.config.validate()?;
        Ok(Tracker::assemble(
            Arc::new(self.store),
            Arc::new(self.config),
        ))
    }
}
