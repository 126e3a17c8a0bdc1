//! JSON boolean query filter.

use corral_state::{HostState, RequestSpec};
use tracing::debug;

use super::HostFilter;

/// Evaluate the request's `query` scheduler hint — a JSON-encoded
/// boolean expression — against the host's fields. No hint passes all
/// hosts; a hint that does not parse fails closed for every host, so a
/// single bad constraint cannot corrupt unrelated scheduling.
pub struct JsonQueryFilter;

impl HostFilter for JsonQueryFilter {
    fn name(&self) -> &'static str {
        "json_query"
    }

    fn host_passes(&self, host: &HostState, req: &RequestSpec) -> bool {
        let Some(raw) = req.scheduler_hints.query.as_deref() else {
            return true;
        };
        let expr = match serde_json::from_str(raw) {
            Ok(expr) => expr,
            Err(err) => {
                debug!(host = %host.host, %err, "malformed query hint");
                return false;
            }
        };
        corral_match::evaluate(&expr, &|field| host.field(field))
    }
}
