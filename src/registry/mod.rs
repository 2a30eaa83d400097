use crate::backend::{OpBackend, RequestToken};
use crate::core::{EsError, Result, WaitOutcome};
use crate::event::{EventSet, EventSetStats, FailureRecord, OpOrigin};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Opaque handle to a registered event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSetId(u64);

impl std::fmt::Display for EventSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "es-{}", self.0)
    }
}

/// Handle table mapping [`EventSetId`]s to live event sets
///
/// The event set core works on instances; this registry is the surrounding
/// layer that hands out opaque ids and resolves them back, so callers in
/// different components never share references directly. Every id-keyed
/// call serializes on the target set's own mutex, which is all the
/// exclusion the coordination logic needs.
///
/// # Examples
///
/// ```
/// use eventset::EventSetRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> eventset::Result<()> {
/// let registry = EventSetRegistry::new();
/// let es = registry.create()?;
///
/// assert_eq!(registry.count_active(es).await?, 0);
/// assert!(!registry.error_flag(es).await?);
///
/// registry.close(es).await?;
/// # Ok(())
/// # }
/// ```
pub struct EventSetRegistry {
    /// Registered sets, each behind its own mutex
    sets: RwLock<HashMap<u64, Arc<Mutex<EventSet>>>>,
    /// Next handle to mint
    next_id: AtomicU64,
}

impl EventSetRegistry {
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a fresh, empty event set and return its handle.
    pub fn create(&self) -> Result<EventSetId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut sets = self.sets.write()?;
        sets.insert(id, Arc::new(Mutex::new(EventSet::new())));
        debug!("created event set es-{}", id);
        Ok(EventSetId(id))
    }

    /// Number of live event sets in the table.
    pub fn live_sets(&self) -> Result<usize> {
        Ok(self.sets.read()?.len())
    }

    /// Producer contract: track a newly issued operation in a set.
    pub async fn insert(
        &self,
        id: EventSetId,
        token: RequestToken,
        backend: Arc<dyn OpBackend>,
        origin: OpOrigin,
        dependencies: Vec<u64>,
    ) -> Result<u64> {
        let set = self.resolve(id)?;
        let mut set = set.lock().await;
        set.insert(token, backend, origin, dependencies)
    }

    /// Number of operations still in flight in a set.
    pub async fn count_active(&self, id: EventSetId) -> Result<usize> {
        let set = self.resolve(id)?;
        let set = set.lock().await;
        Ok(set.count_active())
    }

    /// Sequence number the set's next insertion will be assigned.
    pub async fn next_sequence(&self, id: EventSetId) -> Result<u64> {
        let set = self.resolve(id)?;
        let set = set.lock().await;
        Ok(set.next_sequence())
    }

    /// Wait on a set's active operations under a shared nanosecond budget.
    ///
    /// See [`EventSet::wait`] for the budget and early-stop semantics.
    pub async fn wait(&self, id: EventSetId, timeout_ns: u64) -> Result<WaitOutcome> {
        let set = self.resolve(id)?;
        let mut set = set.lock().await;
        set.wait(timeout_ns).await
    }

    /// Whether any of the set's operations has failed so far.
    pub async fn error_flag(&self, id: EventSetId) -> Result<bool> {
        let set = self.resolve(id)?;
        let set = set.lock().await;
        Ok(set.error_flag())
    }

    /// Number of failure records the set currently holds.
    pub async fn error_count(&self, id: EventSetId) -> Result<usize> {
        let set = self.resolve(id)?;
        let set = set.lock().await;
        Ok(set.error_count())
    }

    /// Remove and return up to `max` failure records, oldest first.
    pub async fn drain_errors(&self, id: EventSetId, max: usize) -> Result<Vec<FailureRecord>> {
        let set = self.resolve(id)?;
        let mut set = set.lock().await;
        set.drain_errors(max)
    }

    /// Snapshot of a set's bookkeeping.
    pub async fn stats(&self, id: EventSetId) -> Result<EventSetStats> {
        let set = self.resolve(id)?;
        let set = set.lock().await;
        Ok(set.stats())
    }

    /// Tear down an event set.
    ///
    /// Refuses with [`EsError::OperationsStillActive`] while anything is in
    /// flight, leaving the set registered and untouched; the caller must
    /// wait first. Undrained failure records are dropped with the set.
    pub async fn close(&self, id: EventSetId) -> Result<()> {
        let set = self.resolve(id)?;
        let guard = set.lock().await;
        guard.ensure_no_active()?;

        // Holding the set's mutex through removal keeps a racing insert
        // from slipping in between the check and the drop
        let mut sets = self.sets.write()?;
        sets.remove(&id.0);
        debug!("closed event set {}", id);

        Ok(())
    }

    fn resolve(&self, id: EventSetId) -> Result<Arc<Mutex<EventSet>>> {
        let sets = self.sets.read()?;
        sets.get(&id.0).cloned().ok_or(EsError::InvalidHandle)
    }
}

impl Default for EventSetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
