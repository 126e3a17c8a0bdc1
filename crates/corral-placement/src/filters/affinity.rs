//! Affinity and retry filters: instance-level same/different host,
//! subnet proximity, group affinity, and retry avoidance.

use std::net::IpAddr;

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Reject hosts a previous scheduling attempt already tried.
pub struct RetryFilter;

impl HostFilter for RetryFilter {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let passes = !req.retry_hosts.contains(&host.host);
        if !passes {
            debug!(host = %host.host, "host was already attempted for this request");
        }
        passes
    }
}

/// Place on a host running at least one instance from the hint set.
pub struct SameHostFilter;

impl HostFilter for SameHostFilter {
    fn name(&self) -> &'static str {
        "same_host"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let wanted = &req.scheduler_hints.same_host;
        if wanted.is_empty() {
            return true;
        }
        wanted.iter().any(|id| host.instances.contains_key(id))
    }
}

/// Place on a host running none of the instances in the hint set.
pub struct DifferentHostFilter;

impl HostFilter for DifferentHostFilter {
    fn name(&self) -> &'static str {
        "different_host"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let unwanted = &req.scheduler_hints.different_host;
        !unwanted.iter().any(|id| host.instances.contains_key(id))
    }
}

/// Place near a given host address, within the hinted subnet.
pub struct CidrAffinityFilter;

const DEFAULT_CIDR: &str = "/24";

impl HostFilter for CidrAffinityFilter {
    fn name(&self) -> &'static str {
        "cidr_affinity"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let Some(near_ip) = req.scheduler_hints.build_near_host_ip else {
            return true;
        };
        let cidr = req.scheduler_hints.cidr.as_deref().unwrap_or(DEFAULT_CIDR);
        let Some(prefix) = parse_prefix_len(cidr) else {
            debug!(cidr, "malformed cidr hint");
            return false;
        };
        // A host with no known address cannot prove proximity.
        let Some(host_ip) = host.host_ip else {
            return false;
        };
        same_subnet(host_ip, near_ip, prefix)
    }
}

fn parse_prefix_len(cidr: &str) -> Option<u8> {
    cidr.strip_prefix('/')?.parse().ok()
}

fn same_subnet(a: IpAddr, b: IpAddr, prefix: u8) -> bool {
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => {
            if prefix > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            u32::from(a) & mask == u32::from(b) & mask
        }
        (IpAddr::V6(a), IpAddr::V6(b)) => {
            if prefix > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            u128::from(a) & mask == u128::from(b) & mask
        }
        _ => false,
    }
}

/// Group affinity (place with the group) or anti-affinity (spread
/// away from it), against the hosts the group already occupies.
pub struct GroupAffinityFilter {
    pub anti: bool,
}

impl HostFilter for GroupAffinityFilter {
    fn name(&self) -> &'static str {
        if self.anti { "group_anti_affinity" } else { "group_affinity" }
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let group_hosts = &req.scheduler_hints.group_hosts;
        if group_hosts.is_empty() {
            // No members placed yet: any host is fine for either mode.
            return true;
        }
        let occupied = group_hosts.contains(&host.host);
        if self.anti { !occupied } else { occupied }
    }
}
