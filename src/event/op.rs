use crate::backend::{OpBackend, RequestToken};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::Location;
use std::sync::Arc;

/// Call site that issued an asynchronous operation.
///
/// Captured when the producer inserts the operation and carried into the
/// failure record if the operation ends in error, so diagnostics point back
/// at the issuing code rather than at the event set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpOrigin {
    /// Name of the API routine that started the operation
    pub api_name: String,
    /// Rendered arguments of that call, for diagnostics only
    pub api_args: String,
    /// Source file of the issuing call site
    pub file: String,
    /// Function the call was made from
    pub function: String,
    /// Line of the issuing call site
    pub line: u32,
}

impl OpOrigin {
    /// Capture the caller's location along with the API name and arguments.
    #[track_caller]
    pub fn capture(api_name: impl Into<String>, api_args: impl Into<String>) -> Self {
        let loc = Location::caller();
        Self {
            api_name: api_name.into(),
            api_args: api_args.into(),
            file: loc.file().to_string(),
            function: String::new(),
            line: loc.line(),
        }
    }

    /// Record the issuing function's name.
    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }
}

/// One tracked asynchronous operation
///
/// Exclusively owned by the active list of exactly one event set from
/// insertion until it reaches a terminal state. The backend request behind
/// `token` is released on success, or once a failure record has captured
/// its error context.
pub struct OpHandle {
    /// Sequence number assigned at insertion; used only for external
    /// correlation, never as a lookup key
    pub sequence: u64,
    /// Opaque backend request
    pub token: RequestToken,
    /// Backend that owns the request
    pub backend: Arc<dyn OpBackend>,
    /// Sequence numbers of same-set operations that must reach a terminal
    /// state before this one may be waited on
    pub dependencies: Vec<u64>,
    /// Issuing call site
    pub origin: OpOrigin,
    /// When the operation was inserted
    pub inserted_at: DateTime<Utc>,
}

impl OpHandle {
    pub(crate) fn new(
        sequence: u64,
        token: RequestToken,
        backend: Arc<dyn OpBackend>,
        dependencies: Vec<u64>,
        origin: OpOrigin,
    ) -> Self {
        Self {
            sequence,
            token,
            backend,
            dependencies,
            origin,
            inserted_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for OpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpHandle")
            .field("sequence", &self.sequence)
            .field("token", &self.token)
            .field("dependencies", &self.dependencies)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
