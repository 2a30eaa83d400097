use super::record::FailureRecord;
use super::set::EventSet;
use crate::backend::OpStatus;
use crate::core::{EsError, Result, WaitBudget, WaitOutcome, WAIT_FOREVER};
use crate::event::op::OpHandle;
use log::{debug, warn};
use tokio::time::Instant;

impl EventSet {
    /// Advance completion state of active operations under one shared
    /// wall-clock budget of `timeout_ns` nanoseconds.
    ///
    /// The budget is for the whole call, not per operation: if the first
    /// operation takes 4ns of a 10ns budget, the rest get at most 6ns
    /// between them. Once it reaches zero, remaining operations are only
    /// checked for completion, never blocked on. [`WAIT_FOREVER`] blocks
    /// until every operation is terminal; [`crate::core::WAIT_NONE`] checks
    /// each once.
    ///
    /// Operations are visited in insertion order. One whose dependencies
    /// have not all reached a terminal state is left in place without
    /// touching its backend. Completed operations are removed; a failure
    /// stops the pass immediately, so the returned in-progress count is a
    /// lower bound whenever `op_failed` is set.
    ///
    /// An `Err` here means the coordination call itself failed (backend
    /// infrastructure); a tracked operation failing is reported through
    /// [`WaitOutcome::op_failed`] and the failure records instead.
    pub async fn wait(&mut self, timeout_ns: u64) -> Result<WaitOutcome> {
        let indefinite = timeout_ns == WAIT_FOREVER;
        let mut remaining_ns = timeout_ns;
        let mut op_failed = false;

        let mut idx = 0;
        while idx < self.active.len() {
            let (sequence, token, backend) = {
                let op = match self.active.get(idx) {
                    Some(op) => op,
                    None => break,
                };
                if !self.deps_terminal(op) {
                    idx += 1;
                    continue;
                }
                (op.sequence, op.token, op.backend.clone())
            };

            let budget = if indefinite {
                WaitBudget::Forever
            } else {
                WaitBudget::from_ns(remaining_ns)
            };

            let started = Instant::now();
            let status = backend
                .wait(token, budget)
                .await
                .map_err(|e| EsError::WaitFailed(e.to_string()))?;

            if !indefinite {
                let elapsed = started.elapsed().as_nanos().min(u64::MAX as u128) as u64;
                remaining_ns = remaining_ns.saturating_sub(elapsed);
            }

            match status {
                OpStatus::Succeeded => {
                    let op = self.remove_active(idx);
                    debug!("op #{} completed", op.sequence);
                    op.backend
                        .release(op.token)
                        .await
                        .map_err(|e| EsError::WaitFailed(e.to_string()))?;
                    // Do not advance idx: the next operation shifted down
                }
                OpStatus::Failed(context) => {
                    let op = self.remove_active(idx);
                    warn!("op #{} failed: {}", op.sequence, context.message);

                    self.failed
                        .push_back(FailureRecord::from_failed_op(&op, context));
                    self.err_occurred = true;
                    op_failed = true;

                    op.backend
                        .release(op.token)
                        .await
                        .map_err(|e| EsError::WaitFailed(e.to_string()))?;

                    // First failure ends the pass; nothing further is
                    // polled or waited this call
                    break;
                }
                OpStatus::Pending => {
                    debug!("op #{} still in progress", sequence);
                    idx += 1;
                }
            }
        }

        Ok(WaitOutcome {
            num_in_progress: self.active.len(),
            op_failed,
        })
    }

    /// Whether all of an operation's dependencies have left the active
    /// list. A failed dependency counts as terminal.
    fn deps_terminal(&self, op: &OpHandle) -> bool {
        op.dependencies
            .iter()
            .all(|dep| !self.seqs_active.contains(dep))
    }

    fn remove_active(&mut self, idx: usize) -> OpHandle {
        let op = self
            .active
            .remove(idx)
            .expect("wait pass index out of bounds");
        self.seqs_active.remove(&op.sequence);
        debug_assert_eq!(self.active.len(), self.seqs_active.len());
        op
    }
}
