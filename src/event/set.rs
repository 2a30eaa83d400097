use super::list::OpList;
use super::op::{OpHandle, OpOrigin};
use super::record::FailureRecord;
use crate::backend::{OpBackend, RequestToken};
use crate::core::{EsError, Result};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Tracks a batch of in-flight asynchronous operations.
///
/// Owns two insertion-ordered lists: `active` for operations still in
/// flight and `failed` for diagnostics of operations that ended in error.
/// An operation is in at most one of the two at any time; success discards
/// it, failure moves its diagnostics to `failed`.
///
/// The set runs no threads of its own. Completion only advances when a
/// caller invokes [`EventSet::wait`], which polls and waits on the backend
/// of each operation under one shared time budget.
pub struct EventSet {
    /// In-flight operations, insertion order = issue order
    pub(super) active: OpList<OpHandle>,
    /// Failure diagnostics, insertion order = detection order
    pub(super) failed: OpList<FailureRecord>,
    /// Next sequence number to assign; monotonic, never reused
    pub(super) op_counter: u64,
    /// Set on first failure and never cleared by this crate
    pub(super) err_occurred: bool,
    /// Sequence numbers currently in `active`, kept in lockstep for O(1)
    /// dependency checks
    pub(super) seqs_active: HashSet<u64>,
}

impl EventSet {
    /// Create an empty event set: counter 0, both lists empty, no error.
    pub fn new() -> Self {
        Self {
            active: OpList::new(),
            failed: OpList::new(),
            op_counter: 0,
            err_occurred: false,
            seqs_active: HashSet::new(),
        }
    }

    /// Track a newly issued operation; returns its sequence number.
    ///
    /// Called by the producer after it has started the request against
    /// `backend`. Every dependency must be a sequence number this set has
    /// already assigned; anything else is rejected as an invalid argument.
    pub fn insert(
        &mut self,
        token: RequestToken,
        backend: Arc<dyn OpBackend>,
        origin: OpOrigin,
        dependencies: Vec<u64>,
    ) -> Result<u64> {
        for &dep in &dependencies {
            if dep >= self.op_counter {
                return Err(EsError::InvalidArgument(format!(
                    "dependency {} has not been assigned yet (next sequence is {})",
                    dep, self.op_counter
                )));
            }
        }

        let sequence = self.op_counter;
        self.op_counter += 1;

        self.active
            .push_back(OpHandle::new(sequence, token, backend, dependencies, origin));
        self.seqs_active.insert(sequence);

        debug_assert_eq!(self.active.len(), self.seqs_active.len());
        debug!("inserted op #{} (request {})", sequence, token);

        Ok(sequence)
    }

    /// Number of operations still in flight. O(1), never blocks.
    pub fn count_active(&self) -> usize {
        self.active.len()
    }

    /// Sequence number the next insertion will be assigned.
    ///
    /// For wrapping layers that match operations to errors reported
    /// elsewhere; reading it does not advance the counter.
    pub fn next_sequence(&self) -> u64 {
        self.op_counter
    }

    /// Whether any tracked operation has failed so far.
    ///
    /// Sticky: once set it stays set, even after all failure records have
    /// been drained. Does not poll, so failures not yet waited on are
    /// invisible here.
    pub fn error_flag(&self) -> bool {
        self.err_occurred
    }

    /// Number of failure records currently held. Never waits.
    pub fn error_count(&self) -> usize {
        if self.err_occurred { self.failed.len() } else { 0 }
    }

    /// Remove and return up to `max` failure records, oldest first.
    ///
    /// The caller becomes the owner of the returned records; the set keeps
    /// nothing. Draining everything does not reset [`EventSet::error_flag`].
    /// No failures present is not an error: the result is just empty.
    pub fn drain_errors(&mut self, max: usize) -> Result<Vec<FailureRecord>> {
        if max == 0 {
            return Err(EsError::InvalidArgument(
                "drain_errors requires room for at least one record".into(),
            ));
        }

        let take = max.min(self.failed.len());
        let mut records = Vec::with_capacity(take);
        for _ in 0..take {
            // pop_front keeps detection order
            if let Some(record) = self.failed.pop_front() {
                records.push(record);
            }
        }

        if !records.is_empty() {
            debug!(
                "drained {} failure record(s), {} remaining",
                records.len(),
                self.failed.len()
            );
        }

        Ok(records)
    }

    /// Check that the set may be torn down.
    ///
    /// Closing is only allowed once nothing is in flight; callers must wait
    /// first. Undrained failure records do not block closing, they are
    /// dropped with the set.
    pub fn ensure_no_active(&self) -> Result<()> {
        if self.active.is_empty() {
            Ok(())
        } else {
            Err(EsError::OperationsStillActive(self.active.len()))
        }
    }

    /// Snapshot of the set's bookkeeping.
    pub fn stats(&self) -> EventSetStats {
        EventSetStats {
            active: self.active.len(),
            failed: self.failed.len(),
            next_sequence: self.op_counter,
            err_occurred: self.err_occurred,
        }
    }
}

impl Default for EventSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventSet {
    fn drop(&mut self) {
        if !self.active.is_empty() {
            // Backend requests cannot be released from Drop (release is
            // async); the orderly path is wait-until-empty, then close.
            log::warn!(
                "EventSet dropped with {} operation(s) still active; their backend requests leak",
                self.active.len()
            );
        }
    }
}

/// Event set statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventSetStats {
    pub active: usize,
    pub failed: usize,
    pub next_sequence: u64,
    pub err_occurred: bool,
}

impl std::fmt::Display for EventSetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event Set: {} active, {} failed, next op #{}, error flag {}",
            self.active, self.failed, self.next_sequence, self.err_occurred
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TaskBackend;

    fn test_backend() -> Arc<dyn OpBackend> {
        Arc::new(TaskBackend::new())
    }

    fn origin(api: &str) -> OpOrigin {
        OpOrigin::capture(api, "()")
    }

    #[tokio::test]
    async fn sequences_are_dense_and_monotonic() {
        let backend = test_backend();
        let mut es = EventSet::new();

        for expected in 0..10u64 {
            assert_eq!(es.next_sequence(), expected);
            let seq = es
                .insert(expected + 100, backend.clone(), origin("op"), vec![])
                .unwrap();
            assert_eq!(seq, expected);
        }

        assert_eq!(es.count_active(), 10);
        assert_eq!(es.next_sequence(), 10);
    }

    #[tokio::test]
    async fn fresh_set_is_quiet() {
        let mut es = EventSet::new();

        assert_eq!(es.count_active(), 0);
        assert_eq!(es.next_sequence(), 0);
        assert!(!es.error_flag());
        assert_eq!(es.error_count(), 0);
        assert!(es.drain_errors(4).unwrap().is_empty());
        assert!(es.ensure_no_active().is_ok());
    }

    #[tokio::test]
    async fn unassigned_dependency_is_rejected() {
        let backend = test_backend();
        let mut es = EventSet::new();

        let err = es
            .insert(1, backend.clone(), origin("op"), vec![0])
            .unwrap_err();
        assert!(matches!(err, EsError::InvalidArgument(_)));

        // Nothing was tracked and the counter did not advance
        assert_eq!(es.count_active(), 0);
        assert_eq!(es.next_sequence(), 0);

        // A dependency on an already-assigned sequence is fine
        es.insert(1, backend.clone(), origin("op"), vec![]).unwrap();
        es.insert(2, backend, origin("op"), vec![0]).unwrap();
        assert_eq!(es.count_active(), 2);
    }

    #[tokio::test]
    async fn drain_rejects_zero_capacity() {
        let mut es = EventSet::new();
        assert!(matches!(
            es.drain_errors(0),
            Err(EsError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn close_guard_reports_active_count() {
        let backend = test_backend();
        let mut es = EventSet::new();
        es.insert(1, backend.clone(), origin("op"), vec![]).unwrap();
        es.insert(2, backend, origin("op"), vec![]).unwrap();

        match es.ensure_no_active() {
            Err(EsError::OperationsStillActive(n)) => assert_eq!(n, 2),
            other => panic!("expected close guard, got {:?}", other),
        }

        // Keep Drop quiet
        es.active = OpList::new();
        es.seqs_active.clear();
    }

    #[tokio::test]
    async fn stats_render() {
        let es = EventSet::new();
        let stats = es.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(
            stats.to_string(),
            "Event Set: 0 active, 0 failed, next op #0, error flag false"
        );
    }
}
