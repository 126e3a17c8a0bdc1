//! Resource sufficiency filters: RAM, CPU cores, disk, I/O load, and
//! instance count.
//!
//! Usable capacity is physical capacity times an allocation ratio (the
//! oversubscription factor). The RAM and core filters come in a global
//! flavor and a per-aggregate flavor; the aggregate flavor reads the
//! ratio from aggregate metadata and falls back to the global value,
//! taking the minimum when a host's aggregates disagree.

use corral_state::HostState;
use corral_state::RequestSpec;
use tracing::{debug, warn};

use super::HostFilter;

/// Resolve an allocation ratio from aggregate metadata, falling back
/// to `default_ratio` when no aggregate carries the key or no value
/// parses. Conflicting values resolve to the minimum.
fn aggregate_ratio(host: &HostState, key: &str, default_ratio: f64) -> f64 {
    let values = host.aggregate_values(key);
    if values.is_empty() {
        return default_ratio;
    }
    if values.len() > 1 {
        warn!(
            host = %host.host,
            key,
            num_values = values.len(),
            "conflicting aggregate ratio values, using the minimum"
        );
    }
    let parsed: Vec<f64> = values
        .iter()
        .filter_map(|v| match v.parse::<f64>() {
            Ok(ratio) => Some(ratio),
            Err(_) => {
                warn!(host = %host.host, key, value = %v, "could not decode aggregate ratio");
                None
            }
        })
        .collect();
    parsed.into_iter().reduce(f64::min).unwrap_or(default_ratio)
}

/// Only pass hosts with sufficient usable RAM.
pub struct RamFilter {
    pub allocation_ratio: f64,
    pub per_aggregate: bool,
}

impl RamFilter {
    fn ratio_for(&self, host: &HostState) -> f64 {
        if self.per_aggregate {
            aggregate_ratio(host, "ram_allocation_ratio", self.allocation_ratio)
        } else {
            self.allocation_ratio
        }
    }
}

impl HostFilter for RamFilter {
    fn name(&self) -> &'static str {
        if self.per_aggregate { "aggregate_ram" } else { "ram" }
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let requested_ram = req.instance_type.memory_mb as f64;
        let limit = host.total_usable_ram_mb as f64 * self.ratio_for(host);
        let usable_ram = limit - host.used_ram_mb() as f64;
        let passes = usable_ram >= requested_ram;
        if !passes {
            debug!(
                host = %host,
                requested_ram_mb = requested_ram,
                usable_ram_mb = usable_ram,
                "host fails RAM check"
            );
        }
        passes
    }
}

/// Only pass hosts with sufficient usable CPU cores.
pub struct CoreFilter {
    pub allocation_ratio: f64,
    pub per_aggregate: bool,
}

impl CoreFilter {
    fn ratio_for(&self, host: &HostState) -> f64 {
        if self.per_aggregate {
            aggregate_ratio(host, "cpu_allocation_ratio", self.allocation_ratio)
        } else {
            self.allocation_ratio
        }
    }
}

impl HostFilter for CoreFilter {
    fn name(&self) -> &'static str {
        if self.per_aggregate { "aggregate_core" } else { "core" }
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        if host.vcpus_total == 0 {
            // Fail safe: the virt layer is not reporting core counts.
            warn!(host = %host.host, "vcpus not set, assuming CPU collection broken");
            return true;
        }
        let vcpus_limit = host.vcpus_total as f64 * self.ratio_for(host);
        vcpus_limit - host.vcpus_used as f64 >= req.instance_type.vcpus as f64
    }
}

/// Only pass hosts with sufficient usable disk.
pub struct DiskFilter {
    pub allocation_ratio: f64,
}

impl HostFilter for DiskFilter {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let requested_disk = req.instance_type.root_disk_mb as f64;
        let limit = host.total_usable_disk_mb as f64 * self.allocation_ratio;
        let usable_disk = limit - host.used_disk_mb() as f64;
        let passes = usable_disk >= requested_disk;
        if !passes {
            debug!(
                host = %host,
                requested_disk_mb = requested_disk,
                usable_disk_mb = usable_disk,
                "host fails disk check"
            );
        }
        passes
    }
}

/// Reject hosts with too many concurrent I/O-heavy operations.
pub struct IoOpsFilter {
    pub max_io_ops: u32,
}

impl HostFilter for IoOpsFilter {
    fn name(&self) -> &'static str {
        "io_ops"
    }

    fn host_passes(&self, host: &HostState, _req: &RequestSpec) -> bool {
        let passes = host.num_io_ops < self.max_io_ops;
        if !passes {
            debug!(host = %host, max_io_ops = self.max_io_ops, "host fails I/O ops check");
        }
        passes
    }
}

/// Reject hosts already running too many instances.
pub struct NumInstancesFilter {
    pub max_instances: usize,
}

impl HostFilter for NumInstancesFilter {
    fn name(&self) -> &'static str {
        "num_instances"
    }

    fn host_passes(&self, host: &HostState, _req: &RequestSpec) -> bool {
        let passes = host.num_instances() < self.max_instances;
        if !passes {
            debug!(host = %host, max_instances = self.max_instances, "host fails instance count check");
        }
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::testing::{make_host, make_request};
    use corral_state::Aggregate;
    use std::collections::BTreeMap;

    #[test]
    fn ram_filter_applies_allocation_ratio() {
        let mut host = make_host("n1");
        host.total_usable_ram_mb = 1024;
        host.free_ram_mb = 0; // fully used physically

        let mut req = make_request("i-1");
        req.instance_type.memory_mb = 256;

        // 1024 * 1.5 - 1024 used = 512 usable.
        let filter = RamFilter { allocation_ratio: 1.5, per_aggregate: false };
        assert!(filter.host_passes(&host, &req));

        let strict = RamFilter { allocation_ratio: 1.0, per_aggregate: false };
        assert!(!strict.host_passes(&host, &req));
    }

    #[test]
    fn ram_filter_boundary_is_inclusive() {
        let mut host = make_host("n1");
        host.total_usable_ram_mb = 1024;
        host.free_ram_mb = 1024;

        let mut req = make_request("i-1");
        req.instance_type.memory_mb = 1024;

        let filter = RamFilter { allocation_ratio: 1.0, per_aggregate: false };
        assert!(filter.host_passes(&host, &req));
    }

    #[test]
    fn aggregate_ram_ratio_takes_minimum_of_conflicts() {
        let mut host = make_host("n1");
        host.total_usable_ram_mb = 1024;
        host.free_ram_mb = 0;
        host.aggregates = vec![Aggregate {
            name: "agg".to_string(),
            metadata: BTreeMap::from([(
                "ram_allocation_ratio".to_string(),
                vec!["2.0".to_string(), "1.0".to_string()],
            )]),
        }];

        let mut req = make_request("i-1");
        req.instance_type.memory_mb = 256;

        // min(2.0, 1.0) = 1.0 -> no headroom left.
        let filter = RamFilter { allocation_ratio: 1.5, per_aggregate: true };
        assert!(!filter.host_passes(&host, &req));
    }

    #[test]
    fn aggregate_ratio_falls_back_without_metadata() {
        let host = make_host("n1");
        assert_eq!(aggregate_ratio(&host, "ram_allocation_ratio", 1.5), 1.5);
    }

    #[test]
    fn aggregate_ratio_falls_back_on_unparsable_values() {
        let mut host = make_host("n1");
        host.aggregates = vec![Aggregate {
            name: "agg".to_string(),
            metadata: BTreeMap::from([(
                "cpu_allocation_ratio".to_string(),
                vec!["not-a-number".to_string()],
            )]),
        }];
        assert_eq!(aggregate_ratio(&host, "cpu_allocation_ratio", 16.0), 16.0);
    }

    #[test]
    fn core_filter_counts_oversubscribed_cores() {
        let mut host = make_host("n1");
        host.vcpus_total = 4;
        host.vcpus_used = 6;

        let mut req = make_request("i-1");
        req.instance_type.vcpus = 2;

        // 4 * 2.0 - 6 = 2 usable.
        let filter = CoreFilter { allocation_ratio: 2.0, per_aggregate: false };
        assert!(filter.host_passes(&host, &req));

        req.instance_type.vcpus = 3;
        assert!(!filter.host_passes(&host, &req));
    }

    #[test]
    fn core_filter_passes_when_cores_unreported() {
        let mut host = make_host("n1");
        host.vcpus_total = 0;
        let filter = CoreFilter { allocation_ratio: 16.0, per_aggregate: false };
        assert!(filter.host_passes(&host, &make_request("i-1")));
    }

    #[test]
    fn disk_filter_checks_usable_disk() {
        let mut host = make_host("n1");
        host.total_usable_disk_mb = 20_000;
        host.free_disk_mb = 5_000;

        let mut req = make_request("i-1");
        req.instance_type.root_disk_mb = 5_000;

        let filter = DiskFilter { allocation_ratio: 1.0 };
        assert!(filter.host_passes(&host, &req));

        req.instance_type.root_disk_mb = 5_001;
        assert!(!filter.host_passes(&host, &req));
    }

    #[test]
    fn io_ops_filter_rejects_busy_hosts() {
        let mut host = make_host("n1");
        host.num_io_ops = 8;
        let filter = IoOpsFilter { max_io_ops: 8 };
        assert!(!filter.host_passes(&host, &make_request("i-1")));

        host.num_io_ops = 7;
        assert!(filter.host_passes(&host, &make_request("i-1")));
    }

    #[test]
    fn num_instances_filter_caps_instance_count() {
        let mut host = make_host("n1");
        for i in 0..3 {
            host.instances.insert(
                format!("i-{i}"),
                corral_state::HostInstance { instance_type: "m1.small".to_string() },
            );
        }
        let filter = NumInstancesFilter { max_instances: 3 };
        assert!(!filter.host_passes(&host, &make_request("i-x")));

        let roomy = NumInstancesFilter { max_instances: 4 };
        assert!(roomy.host_passes(&host, &make_request("i-x")));
    }
}
