//! Hard-constraint host filters.
//!
//! A filter is a pure predicate over one host snapshot and one request.
//! Filters never mutate `HostState`; anything they need (aggregate
//! metadata, attestation level, capability maps) is already embedded in
//! the snapshot. Missing host-side data fails closed unless a filter
//! documents a pass-open default (for example "no extra specs declared
//! passes all hosts").

use std::collections::BTreeMap;

use corral_state::{HostState, RequestSpec};

use crate::config::SchedulerConfig;
use crate::error::{ScheduleError, ScheduleResult};

pub mod affinity;
pub mod capabilities;
pub mod compute;
pub mod image;
pub mod query;
pub mod resources;
pub mod tenancy;
pub mod trust;
pub mod zone;

/// A hard placement constraint.
///
/// Implementations must be reentrant pure functions over their inputs;
/// the engine may evaluate them concurrently across scheduling calls.
pub trait HostFilter: Send + Sync {
    /// Registry identifier for this filter.
    fn name(&self) -> &'static str;

    /// Whether `host` can accept `req`.
    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool;
}

/// No-op filter that accepts every host.
pub struct AllHostsFilter;

impl HostFilter for AllHostsFilter {
    fn name(&self) -> &'static str {
        "all_hosts"
    }

    fn host_passes(&self, _host: &HostState, _req: &RequestSpec) -> bool {
        true
    }
}

type FilterFactory = Box<dyn Fn(&SchedulerConfig) -> Box<dyn HostFilter> + Send + Sync>;

/// Maps filter identifiers to constructors. New filters register here;
/// the orchestrator never needs to know about them.
pub struct FilterRegistry {
    factories: BTreeMap<String, FilterFactory>,
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Registry preloaded with every built-in filter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("all_hosts", |_| Box::new(AllHostsFilter));
        registry.register("retry", |_| Box::new(affinity::RetryFilter));
        registry.register("same_host", |_| Box::new(affinity::SameHostFilter));
        registry.register("different_host", |_| Box::new(affinity::DifferentHostFilter));
        registry.register("cidr_affinity", |_| Box::new(affinity::CidrAffinityFilter));
        registry.register("group_affinity", |_| {
            Box::new(affinity::GroupAffinityFilter { anti: false })
        });
        registry.register("group_anti_affinity", |_| {
            Box::new(affinity::GroupAffinityFilter { anti: true })
        });
        registry.register("availability_zone", |cfg| {
            Box::new(zone::AvailabilityZoneFilter {
                default_zone: cfg.default_availability_zone.clone(),
            })
        });
        registry.register("compute", |_| Box::new(compute::ComputeFilter));
        registry.register("ram", |cfg| {
            Box::new(resources::RamFilter {
                allocation_ratio: cfg.ram_allocation_ratio,
                per_aggregate: false,
            })
        });
        registry.register("aggregate_ram", |cfg| {
            Box::new(resources::RamFilter {
                allocation_ratio: cfg.ram_allocation_ratio,
                per_aggregate: true,
            })
        });
        registry.register("core", |cfg| {
            Box::new(resources::CoreFilter {
                allocation_ratio: cfg.cpu_allocation_ratio,
                per_aggregate: false,
            })
        });
        registry.register("aggregate_core", |cfg| {
            Box::new(resources::CoreFilter {
                allocation_ratio: cfg.cpu_allocation_ratio,
                per_aggregate: true,
            })
        });
        registry.register("disk", |cfg| {
            Box::new(resources::DiskFilter { allocation_ratio: cfg.disk_allocation_ratio })
        });
        registry.register("io_ops", |cfg| {
            Box::new(resources::IoOpsFilter { max_io_ops: cfg.max_io_ops_per_host })
        });
        registry.register("num_instances", |cfg| {
            Box::new(resources::NumInstancesFilter {
                max_instances: cfg.max_instances_per_host,
            })
        });
        registry.register("compute_capabilities", |_| {
            Box::new(capabilities::ComputeCapabilitiesFilter)
        });
        registry.register("aggregate_extra_specs", |_| {
            Box::new(capabilities::AggregateExtraSpecsFilter)
        });
        registry.register("image_properties", |_| Box::new(image::ImagePropertiesFilter));
        registry.register("aggregate_image_properties", |cfg| {
            Box::new(image::AggregateImagePropertiesFilter {
                namespace: cfg.aggregate_image_properties_namespace.clone(),
            })
        });
        registry.register("isolated_hosts", |cfg| {
            Box::new(image::IsolatedHostsFilter {
                isolated_hosts: cfg.isolated_hosts.clone(),
                isolated_images: cfg.isolated_images.clone(),
                restrict: cfg.restrict_isolated_hosts_to_isolated_images,
            })
        });
        registry.register("json_query", |_| Box::new(query::JsonQueryFilter));
        registry.register("trusted", |_| Box::new(trust::TrustedFilter));
        registry.register("type_affinity", |_| Box::new(tenancy::TypeAffinityFilter));
        registry.register("aggregate_type_affinity", |_| {
            Box::new(tenancy::AggregateTypeAffinityFilter)
        });
        registry.register("tenant_isolation", |_| Box::new(tenancy::TenantIsolationFilter));
        registry
    }

    /// Register a filter under an identifier usable in configuration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&SchedulerConfig) -> Box<dyn HostFilter> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiate the named filter, or fail the call: an unknown
    /// identifier means the requested policy cannot be honored.
    pub fn create(
        &self,
        name: &str,
        config: &SchedulerConfig,
    ) -> ScheduleResult<Box<dyn HostFilter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ScheduleError::UnknownFilter(name.to_string()))?;
        Ok(factory(config))
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{make_host, make_request};
    use super::*;

    #[test]
    fn registry_creates_known_filters() {
        let registry = FilterRegistry::with_defaults();
        let config = SchedulerConfig::default();
        for name in ["all_hosts", "ram", "compute", "json_query", "trusted"] {
            let filter = registry.create(name, &config).unwrap();
            assert_eq!(filter.name(), name);
        }
    }

    #[test]
    fn registry_rejects_unknown_identifier() {
        let registry = FilterRegistry::with_defaults();
        let Err(err) = registry.create("bogus", &SchedulerConfig::default()) else {
            panic!("expected unknown-filter error");
        };
        assert!(matches!(err, ScheduleError::UnknownFilter(name) if name == "bogus"));
    }

    #[test]
    fn external_filters_can_register() {
        struct EvenHostsOnly;
        impl HostFilter for EvenHostsOnly {
            fn name(&self) -> &'static str {
                "even_hosts"
            }
            fn host_passes(&self, host: &HostState, _req: &RequestSpec) -> bool {
                host.host.ends_with(['0', '2', '4', '6', '8'])
            }
        }

        let mut registry = FilterRegistry::with_defaults();
        registry.register("even_hosts", |_| Box::new(EvenHostsOnly));

        let filter = registry.create("even_hosts", &SchedulerConfig::default()).unwrap();
        assert!(filter.host_passes(&make_host("n2"), &make_request("i-1")));
        assert!(!filter.host_passes(&make_host("n3"), &make_request("i-1")));
    }

    #[test]
    fn all_hosts_passes_everything() {
        let filter = AllHostsFilter;
        assert!(filter.host_passes(&make_host("n1"), &make_request("i-1")));
    }
}
