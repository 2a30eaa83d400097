pub mod error;
pub mod types;

pub use error::{EsError, Result};
pub use types::{WaitBudget, WaitOutcome, WAIT_FOREVER, WAIT_NONE};
