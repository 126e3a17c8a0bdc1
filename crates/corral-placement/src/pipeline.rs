//! Filter and weigh passes over a host snapshot.
//!
//! Filtering applies every hard constraint to every candidate and keeps
//! only hosts that pass all of them. Weighing scores the survivors:
//! each weigher's raw scores are min-max normalized to `[0, 1]` across
//! the surviving set, scaled by the weigher's multiplier, and summed.
//! Ordering is deterministic: equal totals keep their input order.

use corral_state::{HostState, NodeId, RequestSpec};
use tracing::debug;

use crate::filters::HostFilter;
use crate::weights::HostWeigher;

/// A surviving host with its combined weigher score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHost {
    pub host: NodeId,
    pub total: f64,
}

/// Run the filter chain over a snapshot, returning the hosts that pass
/// every filter.
///
/// `force_hosts` pins the request to the named hosts and skips the
/// filter chain entirely; `ignore_hosts` removes hosts before any
/// filter sees them.
pub fn filter_hosts<'a>(
    filters: &[Box<dyn HostFilter>],
    hosts: &'a [HostState],
    req: &RequestSpec,
) -> Vec<&'a HostState> {
    if !req.force_hosts.is_empty() {
        let forced: Vec<&HostState> = hosts
            .iter()
            .filter(|h| req.force_hosts.iter().any(|f| f == &h.host))
            .collect();
        debug!(
            instance = %req.instance_id,
            forced = forced.len(),
            "forced host list bypasses filters"
        );
        return forced;
    }

    hosts
        .iter()
        .filter(|h| !req.ignore_hosts.iter().any(|i| i == &h.host))
        .filter(|host| {
            for filter in filters {
                if !filter.host_passes(host, req) {
                    debug!(
                        host = %host.host,
                        filter = filter.name(),
                        instance = %req.instance_id,
                        "host rejected"
                    );
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Score surviving hosts and return them best-first.
///
/// A weigher returning `None` for a host (missing data) is assigned the
/// lowest raw score that weigher produced across the set. When every
/// raw score is equal the normalized score is 0.0 for all hosts, so a
/// weigher with no signal contributes nothing.
pub fn weigh_hosts(
    weighers: &[(Box<dyn HostWeigher>, f64)],
    hosts: &[&HostState],
    req: &RequestSpec,
) -> Vec<ScoredHost> {
    let mut totals = vec![0.0f64; hosts.len()];

    for (weigher, multiplier) in weighers {
        let raw: Vec<Option<f64>> =
            hosts.iter().map(|h| weigher.weigh_host(h, req)).collect();

        let min = raw
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let max = raw
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() {
            // No host produced a score for this weigher.
            continue;
        }

        let range = max - min;
        for (i, score) in raw.into_iter().enumerate() {
            let value = score.unwrap_or(min);
            let normalized = if range > 0.0 { (value - min) / range } else { 0.0 };
            totals[i] += multiplier * normalized;
        }
    }

    let mut scored: Vec<ScoredHost> = hosts
        .iter()
        .zip(totals)
        .map(|(host, total)| ScoredHost { host: host.host.clone(), total })
        .collect();
    // Stable sort keeps input order on ties, so results are repeatable
    // for identical inputs.
    scored.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
