//! Placement engine error types.

use thiserror::Error;

/// Result type alias for placement engine operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors that abort a scheduling call before any filtering begins.
///
/// Running out of hosts mid-batch is not an error; it is reported as a
/// [`crate::PlacementOutcome::NoValidHost`] in the aggregate result.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown weigher: {0}")]
    UnknownWeigher(String),
}
