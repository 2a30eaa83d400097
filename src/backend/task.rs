use super::contract::{FailureContext, OpBackend, OpStatus, RequestToken};
use crate::core::{EsError, Result, WaitBudget};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::task::JoinHandle;

/// In-process backend that runs each request as a tokio task
///
/// The reference implementation of [`OpBackend`]. Producers call
/// [`TaskBackend::submit`] to start an operation and hand the returned token
/// to an event set. Completion is published through a `watch` channel, so
/// any number of polls and waits can observe it.
pub struct TaskBackend {
    /// Live request slots, keyed by token
    slots: Mutex<HashMap<RequestToken, Slot>>,
    /// Next request token
    next_token: AtomicU64,
}

struct Slot {
    /// `None` until the task finishes, then the terminal status
    outcome: watch::Receiver<Option<OpStatus>>,
    task: JoinHandle<()>,
}

impl TaskBackend {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Start an asynchronous operation and return its request token.
    ///
    /// The future's `Err` becomes the request's captured failure context,
    /// cause chain included. Must be called from within a tokio runtime.
    pub fn submit<F>(&self, fut: F) -> Result<RequestToken>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let status = match fut.await {
                Ok(()) => OpStatus::Succeeded,
                Err(err) => OpStatus::Failed(FailureContext::from_error(&err)),
            };
            // Receivers may already be gone if the request was released
            let _ = tx.send(Some(status));
        });

        let mut slots = self.slots.lock()?;
        slots.insert(token, Slot { outcome: rx, task });
        debug!("submitted request {}", token);

        Ok(token)
    }

    /// Number of requests the backend still holds state for.
    pub fn live_requests(&self) -> Result<usize> {
        Ok(self.slots.lock()?.len())
    }

    fn subscribe(&self, token: RequestToken) -> Result<watch::Receiver<Option<OpStatus>>> {
        let slots = self.slots.lock()?;
        slots
            .get(&token)
            .map(|slot| slot.outcome.clone())
            .ok_or_else(|| EsError::BackendError(format!("unknown request token {}", token)))
    }
}

impl Default for TaskBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OpBackend for TaskBackend {
    async fn poll(&self, token: RequestToken) -> Result<OpStatus> {
        let rx = self.subscribe(token)?;
        let status = rx.borrow().clone();
        Ok(status.unwrap_or(OpStatus::Pending))
    }

    async fn wait(&self, token: RequestToken, budget: WaitBudget) -> Result<OpStatus> {
        let mut rx = self.subscribe(token)?;

        let deadline = match budget {
            WaitBudget::Bounded(d) => Some(Instant::now() + d),
            _ => None,
        };

        loop {
            if let Some(status) = rx.borrow().clone() {
                return Ok(status);
            }

            match budget {
                WaitBudget::Poll => return Ok(OpStatus::Pending),
                WaitBudget::Forever => {
                    if rx.changed().await.is_err() {
                        // Sender dropped without publishing a terminal state
                        return Err(EsError::BackendError(format!(
                            "request {} terminated without reporting",
                            token
                        )));
                    }
                }
                WaitBudget::Bounded(_) => {
                    let remaining = deadline
                        .map(|d| d.saturating_duration_since(Instant::now()))
                        .unwrap_or_default();
                    if remaining.is_zero() {
                        return Ok(OpStatus::Pending);
                    }
                    match tokio::time::timeout(remaining, rx.changed()).await {
                        Err(_) => return Ok(OpStatus::Pending),
                        Ok(Err(_)) => {
                            return Err(EsError::BackendError(format!(
                                "request {} terminated without reporting",
                                token
                            )));
                        }
                        Ok(Ok(())) => {}
                    }
                }
            }
        }
    }

    async fn release(&self, token: RequestToken) -> Result<()> {
        let slot = {
            let mut slots = self.slots.lock()?;
            slots.remove(&token)
        };

        match slot {
            Some(slot) => {
                if !slot.task.is_finished() {
                    warn!("releasing request {} while still running; aborting", token);
                }
                slot.task.abort();
                Ok(())
            }
            None => Err(EsError::BackendError(format!(
                "unknown request token {}",
                token
            ))),
        }
    }
}
