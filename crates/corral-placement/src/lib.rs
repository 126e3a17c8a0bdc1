//! corral-placement — the placement decision engine.
//!
//! Given a snapshot of host states, a batch of placement requests, and
//! a scheduling policy (which filters and weighers to run), the engine
//! produces an ordered placement decision. It never talks to the fleet:
//! node discovery, decision commit, and group membership storage are
//! external collaborators.
//!
//! # Architecture
//!
//! ```text
//! FilterScheduler::schedule(hosts, requests)
//!   └── per instance, strictly in order:
//!       ├── filter pipeline   (hard constraints, first failure wins)
//!       ├── weigher pipeline  (normalized soft preferences)
//!       ├── pick best host    (stable tie-break)
//!       └── virtual consume   (so the next pick sees reduced capacity)
//! ```
//!
//! Filters and weighers are registered by identifier string in
//! [`FilterRegistry`] / [`WeigherRegistry`]; adding one does not touch
//! the orchestrator.

pub mod config;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod scheduler;
pub mod weights;

pub use config::{MetricWeight, SchedulerConfig, WeigherSpec};
pub use error::{ScheduleError, ScheduleResult};
pub use filters::{FilterRegistry, HostFilter};
pub use pipeline::{ScoredHost, filter_hosts, weigh_hosts};
pub use scheduler::{
    CancelToken, FilterScheduler, Placement, PlacementOutcome, PlacementResult,
};
pub use weights::{HostWeigher, WeigherRegistry};
