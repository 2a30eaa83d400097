// ============================================================================
// eventset Library
// ============================================================================

//! Event-set coordination for asynchronous storage operations.
//!
//! Tracks batches of in-flight asynchronous operations, waits on them under
//! one shared time budget, and preserves diagnostics for the ones that fail.
//!
//! A producer starts requests against an [`OpBackend`] and inserts them into
//! an [`EventSet`] (usually through the [`EventSetRegistry`] handle table).
//! Callers then wait with a nanosecond budget that is spent across however
//! many operations are outstanding, query completion and error state, and
//! drain [`FailureRecord`]s for anything that went wrong.
//!
//! ```
//! use eventset::{EventSetRegistry, OpOrigin, TaskBackend, WAIT_FOREVER};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> eventset::Result<()> {
//! let backend = Arc::new(TaskBackend::new());
//! let registry = EventSetRegistry::new();
//! let es = registry.create()?;
//!
//! // Producer side: start an operation, then track it
//! let token = backend.submit(async { Ok(()) })?;
//! registry
//!     .insert(es, token, backend.clone(), OpOrigin::capture("demo_write", "()"), vec![])
//!     .await?;
//!
//! // Consumer side: wait for everything, then tear down
//! let outcome = registry.wait(es, WAIT_FOREVER).await?;
//! assert_eq!(outcome.num_in_progress, 0);
//! assert!(!outcome.op_failed);
//!
//! registry.close(es).await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod backend;
pub mod event;
pub mod registry;

// Re-export main types for convenience
pub use crate::core::{EsError, Result, WaitOutcome, WAIT_FOREVER, WAIT_NONE};
pub use crate::backend::{FailureContext, OpBackend, OpStatus, RequestToken, TaskBackend};
pub use crate::event::{EventSet, EventSetStats, FailureRecord, OpOrigin};
pub use crate::registry::{EventSetId, EventSetRegistry};
