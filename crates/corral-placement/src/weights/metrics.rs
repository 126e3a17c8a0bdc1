//! Metrics weigher: weighted sum of operator-published host metrics.
//!
//! The set of metrics and their ratios comes from configuration. A host
//! missing any configured metric yields no score, which the pipeline
//! maps to the lowest raw score in the set.

use corral_state::{HostState, RequestSpec};

use super::HostWeigher;
use crate::config::MetricWeight;

pub struct MetricsWeigher {
    settings: Vec<MetricWeight>,
}

impl MetricsWeigher {
    pub fn new(settings: Vec<MetricWeight>) -> Self {
        Self { settings }
    }
}

impl HostWeigher for MetricsWeigher {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn weigh_host(&self, host: &HostState, _req: &RequestSpec) -> Option<f64> {
        let mut total = 0.0;
        for setting in &self.settings {
            let value = host.metrics.get(&setting.name)?;
            total += setting.ratio * value;
        }
        Some(total)
    }
}
