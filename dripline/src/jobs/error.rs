//! Job-related error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors that can occur during job processing.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job execution failed.
    #[error("job execution failed: {0}")]
    ExecutionFailed(String),

    /// The job payload failed validation at the consumption boundary.
    #[error("invalid job payload: {0}")]
    InvalidPayload(String),

    /// Data the job depends on does not exist.
    #[error("missing job data: {0}")]
    NotFound(String),

    /// Job timed out.
    #[error("job timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Job queue is at capacity.
    #[error("job queue {queue:?} is full (max: {max})")]
    QueueFull {
        /// Queue name.
        queue: String,
        /// Configured capacity.
        max: usize,
    },

    /// A required service is missing from the job context.
    #[error("{0} is not available in the job context")]
    ServiceUnavailable(&'static str),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
