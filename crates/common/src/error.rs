//! Error types for Flotilla.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlotillaError {
    /// Malformed task or configuration: empty description, cyclic
    /// dependencies, past deadline, out-of-range complexity.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tool, model-call, or plan failure during an execution attempt.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A step or task exceeded its time budget. Kept distinct from
    /// [`FlotillaError::Execution`] so callers can retry timeouts under a
    /// different policy.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The task queue is full and the new task does not outrank the
    /// lowest-priority occupant.
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Operation attempted in the wrong lifecycle state: shutdown, double
    /// start, double submission of a task id.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlotillaError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FlotillaError::Timeout(_))
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, FlotillaError::Capacity(_))
    }
}

pub type Result<T> = std::result::Result<T, FlotillaError>;
