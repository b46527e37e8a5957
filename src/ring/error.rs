//! Error types for the ring scheduler

use crate::error::AppError;

/// Result type for ring operations
pub type RingResult<T> = std::result::Result<T, RingError>;

/// Errors that can occur in ring operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The event queue stayed full for the whole registration wait
    #[error("registry busy")]
    Busy,

    /// A removal referenced a task that is not scheduled
    #[error("task not exists: {0}")]
    NotExists(String),

    /// The ring loops have shut down
    #[error("ring already closed")]
    Closed,

    /// No executor was supplied
    #[error("provider required: at least one executor must be registered")]
    EmptyProvider,

    /// Configuration is invalid
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),
}

impl RingError {
    /// Whether the caller may simply try again later
    pub fn is_transient(&self) -> bool {
        matches!(self, RingError::Busy)
    }
}

impl From<RingError> for AppError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::NotExists(msg) => AppError::NotFound(msg),
            RingError::EmptyProvider | RingError::InvalidConfig(_) => {
                AppError::Configuration(err.to_string())
            }
            RingError::Busy => AppError::Timeout(err.to_string()),
            RingError::Closed => AppError::Internal(err.to_string()),
        }
    }
}
