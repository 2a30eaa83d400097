use crate::core::{Result, WaitBudget};
use async_trait::async_trait;
use serde::Serialize;

/// Opaque reference to one in-flight request, minted by the backend that
/// executes it. Only meaningful to that backend.
pub type RequestToken = u64;

/// Completion state of a request as reported by its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    /// Not finished yet (or the wait budget ran out first).
    Pending,
    Succeeded,
    Failed(FailureContext),
}

/// Error context captured from a request that finished unsuccessfully.
///
/// Owned by whoever holds it; once a failure record carries one, the backend
/// keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureContext {
    /// Top-level description of what went wrong.
    pub message: String,
    /// Cause chain, outermost first. May be empty.
    pub frames: Vec<String>,
}

impl FailureContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Capture an error and its cause chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            frames: err.chain().skip(1).map(|c| c.to_string()).collect(),
        }
    }
}

/// Backend executing asynchronous requests - allows pluggable backends
///
/// The event set never runs an operation itself; it only polls and waits on
/// completion signals through this contract. An `Err` from any method is an
/// infrastructure failure of the backend, distinct from a request's own
/// outcome being `OpStatus::Failed`.
#[async_trait]
pub trait OpBackend: Send + Sync {
    /// Check a request's completion state without blocking.
    async fn poll(&self, token: RequestToken) -> Result<OpStatus>;

    /// Block until the request reaches a terminal state or the budget runs
    /// out; `WaitBudget::Poll` must behave exactly like `poll`.
    async fn wait(&self, token: RequestToken, budget: WaitBudget) -> Result<OpStatus>;

    /// Release backend resources for a request that will no longer be
    /// polled or waited on.
    async fn release(&self, token: RequestToken) -> Result<()>;
}
