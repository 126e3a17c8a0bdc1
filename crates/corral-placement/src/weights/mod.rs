//! Soft-preference host weighers.
//!
//! Each weigher produces one raw score per surviving host; the weigher
//! pipeline normalizes raw scores to `[0, 1]` across the host set,
//! applies the configured multiplier, and sums. A negative multiplier
//! inverts preference (stack instead of spread).

use std::collections::BTreeMap;

use corral_state::{HostState, RequestSpec};

use crate::config::SchedulerConfig;
use crate::error::{ScheduleError, ScheduleResult};

pub mod metrics;
pub mod ram;

/// A soft scoring preference. Like filters, weighers are pure over
/// their inputs and never mutate the host snapshot.
pub trait HostWeigher: Send + Sync {
    /// Registry identifier for this weigher.
    fn name(&self) -> &'static str;

    /// Raw score for one host. `None` means the host is missing the
    /// data this weigher needs; the pipeline treats that as the lowest
    /// raw score in the set rather than an error.
    fn weigh_host(&self, host: &HostState, req: &RequestSpec) -> Option<f64>;
}

type WeigherFactory = Box<dyn Fn(&SchedulerConfig) -> Box<dyn HostWeigher> + Send + Sync>;

/// Maps weigher identifiers to constructors.
pub struct WeigherRegistry {
    factories: BTreeMap<String, WeigherFactory>,
}

impl WeigherRegistry {
    pub fn empty() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Registry preloaded with every built-in weigher.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("free_ram", |_| Box::new(ram::FreeRamWeigher));
        registry.register("metrics", |cfg| {
            Box::new(metrics::MetricsWeigher::new(cfg.metric_weights.clone()))
        });
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&SchedulerConfig) -> Box<dyn HostWeigher> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(
        &self,
        name: &str,
        config: &SchedulerConfig,
    ) -> ScheduleResult<Box<dyn HostWeigher>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ScheduleError::UnknownWeigher(name.to_string()))?;
        Ok(factory(config))
    }
}

impl Default for WeigherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
