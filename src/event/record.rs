use super::op::{OpHandle, OpOrigin};
use crate::backend::FailureContext;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Captured diagnostics for one operation that ended in error.
///
/// Built by the wait engine when a failure is detected and held in the
/// event set's failed list until drained. Draining moves the record to the
/// caller by value; the set keeps nothing behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Sequence number the operation was inserted under
    pub sequence: u64,
    /// Name of the API routine that started the operation
    pub api_name: String,
    /// Rendered arguments of that call
    pub api_args: String,
    /// Source file of the issuing call site
    pub file: String,
    /// Function the call was made from
    pub function: String,
    /// Line of the issuing call site
    pub line: u32,
    /// When the operation was inserted
    pub inserted_at: DateTime<Utc>,
    /// Error context captured from the backend
    pub context: FailureContext,
}

impl FailureRecord {
    pub(crate) fn from_failed_op(op: &OpHandle, context: FailureContext) -> Self {
        let OpOrigin {
            api_name,
            api_args,
            file,
            function,
            line,
        } = op.origin.clone();

        Self {
            sequence: op.sequence,
            api_name,
            api_args,
            file,
            function,
            line,
            inserted_at: op.inserted_at,
            context,
        }
    }

    /// Render the record as pretty JSON for logs or bug reports.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unserializable: {}>", e))
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "op #{} {}{} at {}:{}: {}",
            self.sequence, self.api_name, self.api_args, self.file, self.line, self.context.message
        )
    }
}
