//! Service liveness filter.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Only pass hosts whose compute service is enabled and heartbeating.
pub struct ComputeFilter;

impl HostFilter for ComputeFilter {
    fn name(&self) -> &'static str {
        "compute"
    }

    fn host_passes(&self, host: &HostState, _req: &RequestSpec) -> bool {
        if !host.enabled {
            debug!(host = %host.host, "host is disabled");
            return false;
        }
        if !host.operational {
            debug!(host = %host.host, "host service is down");
            return false;
        }
        true
    }
}
