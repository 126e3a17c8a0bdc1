//! Scheduler policy configuration.
//!
//! An explicit value passed into the engine at build time, never
//! process-wide state, so several configurations can be exercised side
//! by side in one test run.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One configured weigher and its multiplier. A negative multiplier
/// inverts the preference (pack instead of spread).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeigherSpec {
    pub name: String,
    pub multiplier: f64,
}

impl WeigherSpec {
    pub fn new(name: impl Into<String>, multiplier: f64) -> Self {
        Self { name: name.into(), multiplier }
    }
}

/// A named host metric and its signed ratio for the metrics weigher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricWeight {
    pub name: String,
    pub ratio: f64,
}

/// Policy knobs for one scheduling call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ordered filter identifiers to run.
    pub filters: Vec<String>,
    /// Ordered weighers with multipliers.
    pub weighers: Vec<WeigherSpec>,

    /// Virtual-to-physical RAM oversubscription factor.
    pub ram_allocation_ratio: f64,
    /// Virtual-to-physical CPU oversubscription factor.
    pub cpu_allocation_ratio: f64,
    /// Virtual-to-physical disk oversubscription factor.
    pub disk_allocation_ratio: f64,
    /// Reject hosts with this many concurrent I/O-heavy operations.
    pub max_io_ops_per_host: u32,
    /// Reject hosts with this many instances.
    pub max_instances_per_host: usize,

    /// Zone assumed for hosts that advertise none.
    pub default_availability_zone: String,

    /// Hosts reserved for isolated images, in addition to any host
    /// snapshot carrying the isolated flag.
    pub isolated_hosts: Vec<String>,
    /// Image refs that must land on isolated hosts.
    pub isolated_images: Vec<String>,
    /// When false, isolated hosts may also take non-isolated images.
    pub restrict_isolated_hosts_to_isolated_images: bool,

    /// Namespace prefix limiting which aggregate metadata keys the
    /// aggregate image-properties filter considers (empty = all keys).
    pub aggregate_image_properties_namespace: Option<String>,

    /// Metric name/ratio pairs for the `metrics` weigher.
    pub metric_weights: Vec<MetricWeight>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                "retry".to_string(),
                "availability_zone".to_string(),
                "ram".to_string(),
                "compute".to_string(),
                "compute_capabilities".to_string(),
                "image_properties".to_string(),
            ],
            weighers: vec![WeigherSpec::new("free_ram", 1.0)],
            ram_allocation_ratio: 1.5,
            cpu_allocation_ratio: 16.0,
            disk_allocation_ratio: 1.0,
            max_io_ops_per_host: 8,
            max_instances_per_host: 50,
            default_availability_zone: "default".to_string(),
            isolated_hosts: Vec::new(),
            isolated_images: Vec::new(),
            restrict_isolated_hosts_to_isolated_images: true,
            aggregate_image_properties_namespace: None,
            metric_weights: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// the defaults above.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SchedulerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.ram_allocation_ratio, 1.5);
        assert_eq!(config.cpu_allocation_ratio, 16.0);
        assert_eq!(config.max_io_ops_per_host, 8);
        assert!(config.restrict_isolated_hosts_to_isolated_images);
        assert_eq!(config.weighers, vec![WeigherSpec::new("free_ram", 1.0)]);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            filters = ["ram", "core"]
            ram_allocation_ratio = 1.0

            [[weighers]]
            name = "free_ram"
            multiplier = -1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.filters, vec!["ram", "core"]);
        assert_eq!(config.ram_allocation_ratio, 1.0);
        assert_eq!(config.cpu_allocation_ratio, 16.0); // default preserved
        assert_eq!(config.weighers[0].multiplier, -1.0);
    }
}
