use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsError {
    #[error("Invalid event set handle")]
    InvalidHandle,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to create event set")]
    CreationFailed,

    #[error("Event set has {0} operation(s) still active")]
    OperationsStillActive(usize),

    #[error("Failed to wait on operations: {0}")]
    WaitFailed(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

pub type Result<T> = std::result::Result<T, EsError>;


impl<T> From<std::sync::PoisonError<T>> for EsError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::BackendError(err.to_string())
    }
}
