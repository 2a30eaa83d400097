use std::time::Duration;

/// Timeout value requesting an indefinite wait.
pub const WAIT_FOREVER: u64 = u64::MAX;

/// Timeout value requesting a single completion check without blocking.
pub const WAIT_NONE: u64 = 0;

/// Time budget for one backend wait call.
///
/// A `wait` call on an event set receives a single nanosecond budget that is
/// spent across all operations checked during that call. Each individual
/// backend wait gets whatever is left of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBudget {
    /// Check for completion once, do not block.
    Poll,
    /// Block for at most this long.
    Bounded(Duration),
    /// Block until the operation reaches a terminal state.
    Forever,
}

impl WaitBudget {
    /// Map the wire encoding (nanoseconds with sentinels) to a typed budget.
    pub fn from_ns(ns: u64) -> Self {
        match ns {
            WAIT_NONE => WaitBudget::Poll,
            WAIT_FOREVER => WaitBudget::Forever,
            ns => WaitBudget::Bounded(Duration::from_nanos(ns)),
        }
    }
}

/// Result of one `wait` call on an event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Operations still tracked as active after the pass.
    ///
    /// A lower bound if `op_failed` is set: the pass stops at the first
    /// failure without checking the remaining operations.
    pub num_in_progress: usize,

    /// Whether an operation failed during this call (not cumulative).
    pub op_failed: bool,
}
