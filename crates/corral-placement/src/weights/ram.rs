//! Free-RAM weigher: spread instances across hosts by preferring the
//! host with the most free memory. A negative multiplier turns this
//! into a stacking policy.

use corral_state::{HostState, RequestSpec};

use super::HostWeigher;

pub struct FreeRamWeigher;

impl HostWeigher for FreeRamWeigher {
    fn name(&self) -> &'static str {
        "free_ram"
    }

    fn weigh_host(&self, host: &HostState, _req: &RequestSpec) -> Option<f64> {
        Some(host.free_ram_mb as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::testing::{make_host, make_request};

    #[test]
    fn scores_track_free_ram() {
        let weigher = FreeRamWeigher;
        let req = make_request("i-1");

        let mut low = make_host("h1");
        low.free_ram_mb = 512;
        let mut high = make_host("h2");
        high.free_ram_mb = 4096;

        let low_score = weigher.weigh_host(&low, &req).unwrap();
        let high_score = weigher.weigh_host(&high, &req).unwrap();
        assert!(high_score > low_score);
    }

    #[test]
    fn negative_free_ram_still_scores() {
        // Hosts can be oversubscribed below zero free RAM; the weigher
        // reports the value as-is and normalization handles the range.
        let weigher = FreeRamWeigher;
        let mut host = make_host("h1");
        host.free_ram_mb = -512;
        assert_eq!(weigher.weigh_host(&host, &make_request("i-1")), Some(-512.0));
    }
}
