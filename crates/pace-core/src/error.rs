use thiserror::Error;

/// Caller-recoverable failures raised by engine operations.
///
/// Unknown envelope or bill ids are not errors: those operations return
/// `Ok(None)` / `Ok(false)` and leave state untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Shuffle allocations cover {provided:.2} of the {needed:.2} needed")]
    ShuffleInsufficient { needed: f64, provided: f64 },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
