//! Instance-type affinity and tenant isolation filters.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Dynamically limit hosts to one instance type: reject any host
/// running an instance of a different type. Empty hosts pass.
pub struct TypeAffinityFilter;

impl HostFilter for TypeAffinityFilter {
    fn name(&self) -> &'static str {
        "type_affinity"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let wanted = &req.instance_type.name;
        host.instances.values().all(|i| &i.instance_type == wanted)
    }
}

/// Restrict instance types per aggregate: when a host's aggregates
/// declare `instance_type` metadata, only those types may land there.
pub struct AggregateTypeAffinityFilter;

impl HostFilter for AggregateTypeAffinityFilter {
    fn name(&self) -> &'static str {
        "aggregate_type_affinity"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let allowed = host.aggregate_values("instance_type");
        allowed.is_empty() || allowed.contains(&req.instance_type.name.as_str())
    }
}

/// Isolate tenants in restricted aggregates: a host whose aggregates
/// declare `filter_tenant_id` only accepts requests from those
/// tenants. Hosts without the key accept everyone.
pub struct TenantIsolationFilter;

impl HostFilter for TenantIsolationFilter {
    fn name(&self) -> &'static str {
        "tenant_isolation"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let tenants = host.aggregate_values("filter_tenant_id");
        if tenants.is_empty() {
            return true;
        }
        let passes = req
            .project_id
            .as_deref()
            .is_some_and(|tenant| tenants.contains(&tenant));
        if !passes {
            debug!(host = %host.host, "request tenant not allowed on restricted aggregate");
        }
        passes
    }
}
