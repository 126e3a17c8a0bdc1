//! Trusted computing pool filter.
//!
//! The attestation level itself is fetched and cached by an external
//! trust collaborator and arrives pre-resolved on the host snapshot;
//! this filter only matches it against the request's requirement.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Match the host's attestation level against the `trust:trusted_host`
/// extra spec. Requests without the spec pass everywhere.
pub struct TrustedFilter;

impl HostFilter for TrustedFilter {
    fn name(&self) -> &'static str {
        "trusted"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let Some(spec) = req.instance_type.extra_specs.get(&["trust", "trusted_host"])
        else {
            return true;
        };
        let passes = spec.requirement.matches(host.trust_level.as_str());
        if !passes {
            debug!(
                host = %host.host,
                level = host.trust_level.as_str(),
                declared = %spec.raw,
                "host attestation level does not satisfy trust requirement"
            );
        }
        passes
    }
}
