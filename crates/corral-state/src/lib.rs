//! corral-state — domain types for the placement core.
//!
//! [`HostState`] is a per-scheduling-call snapshot of one compute node,
//! built from data an external fleet-state collaborator supplies; the
//! core never fetches or persists anything itself. The snapshot is
//! mutated only through [`HostState::consume`], which virtually deducts
//! a placed instance's footprint so later picks in the same batch see
//! the reduced capacity.
//!
//! [`RequestSpec`] is one instance's immutable placement request. Extra
//! specs are parsed into scope-path / requirement entries once at
//! construction, not re-split on every filter invocation.

pub mod request;
pub mod types;

pub use request::{ExtraSpec, ExtraSpecs, ImageProperties, InstanceType, RequestSpec, SchedulerHints};
pub use types::{Aggregate, HostInstance, HostState, InstanceId, NodeId, TrustLevel};
