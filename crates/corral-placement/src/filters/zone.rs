//! Availability zone filter.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Only pass hosts in the request's availability zone.
///
/// A host's zones come from aggregate metadata (`availability_zone`
/// key; a node can in theory be in several), falling back to the
/// snapshot's own zone field, then to the configured default zone.
/// Requests without a zone constraint pass everywhere.
pub struct AvailabilityZoneFilter {
    pub default_zone: String,
}

impl HostFilter for AvailabilityZoneFilter {
    fn name(&self) -> &'static str {
        "availability_zone"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let Some(requested) = req.availability_zone.as_deref() else {
            return true;
        };

        let zones = host.aggregate_values("availability_zone");
        let passes = if !zones.is_empty() {
            zones.contains(&requested)
        } else {
            match host.availability_zone.as_deref() {
                Some(zone) => zone == requested,
                None => self.default_zone == requested,
            }
        };
        if !passes {
            debug!(host = %host.host, requested, "host not in requested availability zone");
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

    fn filter() -> AvailabilityZoneFilter {
        AvailabilityZoneFilter { default_zone: "default".to_string() }
    }

    #[test]
    fn no_zone_constraint_passes() {
        assert!(filter().host_passes(&make_host("n1"), &make_request("i-1")));
    }

    #[test]
    fn aggregate_zone_takes_precedence() {
        let mut host = make_host("n1");
        host.availability_zone = Some("az-west".to_string());
        host.aggregates = vec![Aggregate {
            name: "agg".to_string(),
            metadata: BTreeMap::from([(
                "availability_zone".to_string(),
                vec!["az-east".to_string()],
            )]),
        }];

        let mut req = make_request("i-1");
        req.availability_zone = Some("az-east".to_string());
        assert!(filter().host_passes(&host, &req));

        req.availability_zone = Some("az-west".to_string());
        assert!(!filter().host_passes(&host, &req));
    }

    #[test]
    fn falls_back_to_host_field_then_default() {
        let mut host = make_host("n1");
        host.availability_zone = Some("az-west".to_string());

        let mut req = make_request("i-1");
        req.availability_zone = Some("az-west".to_string());
        assert!(filter().host_passes(&host, &req));

        host.availability_zone = None;
        req.availability_zone = Some("default".to_string());
        assert!(filter().host_passes(&host, &req));

        req.availability_zone = Some("az-east".to_string());
        assert!(!filter().host_passes(&host, &req));
    }
}
