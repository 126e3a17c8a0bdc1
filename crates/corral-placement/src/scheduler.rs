//! Iterative batch scheduler.
//!
//! Instances in a batch are placed strictly in request order. After each
//! pick the chosen host's working copy is charged the instance footprint,
//! so later picks in the same batch see reduced capacity without any
//! commit to the fleet. Identical inputs always produce identical
//! placements.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use corral_state::{HostState, NodeId, RequestSpec};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::ScheduleResult;
use crate::filters::{FilterRegistry, HostFilter};
use crate::pipeline::{filter_hosts, weigh_hosts};
use crate::weights::{HostWeigher, WeigherRegistry};

/// Cooperative cancellation handle, checked between instance picks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// One instance's decided destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Position of the instance in the request batch.
    pub instance_index: usize,
    pub instance_id: String,
    pub host: NodeId,
}

/// Terminal state of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Every instance in the batch was placed.
    Complete,
    /// No host survived filtering for the instance at `index`; the
    /// remaining `shortfall` instances (including this one) are unplaced.
    NoValidHost { index: usize, shortfall: usize },
    /// Cancellation was observed before placing the instance at `index`.
    Cancelled { index: usize },
}

/// Placements decided so far plus how the run ended. Partial results
/// are preserved on failure so callers can report exactly which
/// instances went unplaced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    pub placements: Vec<Placement>,
    pub outcome: PlacementOutcome,
}

impl PlacementResult {
    pub fn is_complete(&self) -> bool {
        self.outcome == PlacementOutcome::Complete
    }
}

/// Filter-and-weigh placement engine.
pub struct FilterScheduler {
    filters: Vec<Box<dyn HostFilter>>,
    weighers: Vec<(Box<dyn HostWeigher>, f64)>,
}

impl FilterScheduler {
    /// Build the configured filter and weigher chains. Any identifier
    /// absent from its registry is a configuration error; nothing runs
    /// with a silently shortened chain.
    pub fn from_config(
        config: &SchedulerConfig,
        filter_registry: &FilterRegistry,
        weigher_registry: &WeigherRegistry,
    ) -> ScheduleResult<Self> {
        let mut filters = Vec::with_capacity(config.filters.len());
        for name in &config.filters {
            filters.push(filter_registry.create(name, config)?);
        }
        let mut weighers = Vec::with_capacity(config.weighers.len());
        for spec in &config.weighers {
            weighers.push((weigher_registry.create(&spec.name, config)?, spec.multiplier));
        }
        info!(
            filters = config.filters.len(),
            weighers = config.weighers.len(),
            "scheduler chains built"
        );
        Ok(Self { filters, weighers })
    }

    /// Convenience constructor using the default registries.
    pub fn new(config: &SchedulerConfig) -> ScheduleResult<Self> {
        Self::from_config(
            config,
            &FilterRegistry::with_defaults(),
            &WeigherRegistry::with_defaults(),
        )
    }

    /// Place a batch of requests against a host snapshot.
    pub fn schedule(
        &self,
        hosts: Vec<HostState>,
        requests: &[RequestSpec],
    ) -> PlacementResult {
        self.schedule_with_cancel(hosts, requests, &CancelToken::new())
    }

    /// As [`schedule`](Self::schedule), checking `cancel` before each
    /// instance pick.
    pub fn schedule_with_cancel(
        &self,
        mut hosts: Vec<HostState>,
        requests: &[RequestSpec],
        cancel: &CancelToken,
    ) -> PlacementResult {
        let mut placements = Vec::with_capacity(requests.len());
        // Hosts picked for each group during this batch, merged into the
        // hints of later members so affinity filters see in-flight picks.
        let mut group_picks: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();

        for (index, request) in requests.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(index, "placement run cancelled");
                return PlacementResult {
                    placements,
                    outcome: PlacementOutcome::Cancelled { index },
                };
            }

            let mut request = request.clone();
            if let Some(group) = &request.scheduler_hints.group
                && let Some(picked) = group_picks.get(group)
            {
                for host in picked {
                    if !request.scheduler_hints.group_hosts.contains(host) {
                        request.scheduler_hints.group_hosts.push(host.clone());
                    }
                }
            }

            let survivors = filter_hosts(&self.filters, &hosts, &request);
            if survivors.is_empty() {
                let shortfall = requests.len() - index;
                warn!(
                    instance = %request.instance_id,
                    index,
                    shortfall,
                    "no host passed all filters"
                );
                return PlacementResult {
                    placements,
                    outcome: PlacementOutcome::NoValidHost { index, shortfall },
                };
            }

            let scored = weigh_hosts(&self.weighers, &survivors, &request);
            let chosen = scored[0].host.clone();
            debug!(
                instance = %request.instance_id,
                host = %chosen,
                candidates = scored.len(),
                score = scored[0].total,
                "host selected"
            );

            if let Some(host) = hosts.iter_mut().find(|h| h.host == chosen) {
                host.consume(&request);
            }
            if let Some(group) = &request.scheduler_hints.group {
                group_picks
                    .entry(group.clone())
                    .or_default()
                    .insert(chosen.clone());
            }
            placements.push(Placement {
                instance_index: index,
                instance_id: request.instance_id.clone(),
                host: chosen,
            });
        }

        PlacementResult {
            placements,
            outcome: PlacementOutcome::Complete,
        }
    }
}
