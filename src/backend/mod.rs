pub mod contract;
pub mod task;

pub use contract::{FailureContext, OpBackend, OpStatus, RequestToken};
pub use task::TaskBackend;
