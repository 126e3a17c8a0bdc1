//! Extra-spec capability matching filters.
//!
//! Both filters evaluate the request's parsed extra specs through the
//! operator grammar. `ComputeCapabilitiesFilter` matches against the
//! host's own capability map (scope `capabilities:`, unscoped keys
//! accepted); `AggregateExtraSpecsFilter` matches against aggregate
//! metadata (scope `aggregate_instance_extra_specs:`). Keys scoped to a
//! different filter are skipped, so one extra-specs map can feed both.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

const CAPABILITIES_SCOPE: &str = "capabilities";
const AGGREGATE_SCOPE: &str = "aggregate_instance_extra_specs";

/// Match extra specs against the host capability map. No extra specs
/// declared passes all hosts; a declared key the host cannot resolve
/// fails closed.
pub struct ComputeCapabilitiesFilter;

impl HostFilter for ComputeCapabilitiesFilter {
    fn name(&self) -> &'static str {
        "compute_capabilities"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        for spec in req.instance_type.extra_specs.iter() {
            match spec.scope() {
                Some(CAPABILITIES_SCOPE) | None => {}
                Some(_) => continue, // someone else's scope
            }
            let Some(actual) = host.capability(spec.subpath()) else {
                debug!(host = %host, key = %spec.path.join(":"), "capability not advertised");
                return false;
            };
            if !spec.requirement.matches_value(&actual) {
                debug!(
                    host = %host,
                    key = %spec.path.join(":"),
                    declared = %spec.raw,
                    %actual,
                    "extra spec requirement not satisfied"
                );
                return false;
            }
        }
        true
    }
}

/// Match extra specs against merged aggregate metadata. A key with no
/// aggregate values fails closed; any one matching value passes.
pub struct AggregateExtraSpecsFilter;

impl HostFilter for AggregateExtraSpecsFilter {
    fn name(&self) -> &'static str {
        "aggregate_extra_specs"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        for spec in req.instance_type.extra_specs.iter() {
            match spec.scope() {
                Some(AGGREGATE_SCOPE) | None => {}
                Some(_) => continue,
            }
            let key = spec.subpath().join(":");
            let values = host.aggregate_values(&key);
            if values.is_empty() {
                debug!(host = %host, key = %key, "extra spec key not in any aggregate");
                return false;
            }
            if !values.iter().any(|v| spec.requirement.matches(v)) {
                debug!(
                    host = %host,
                    key = %key,
                    declared = %spec.raw,
                    "no aggregate value satisfies extra spec"
                );
                return false;
            }
        }
        true
    }
}
