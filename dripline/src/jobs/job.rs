//! Core job trait and identifiers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::{JobContext, JobResult};

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random job id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A background job that can be executed asynchronously.
///
/// Jobs are serializable payloads; everything they need at execution time
/// comes through the [`JobContext`].
///
/// # Example
///
/// ```rust
/// use dripline::jobs::{Job, JobContext, JobResult};
/// use async_trait::async_trait;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct PingJob {
///     target: String,
/// }
///
/// #[async_trait]
/// impl Job for PingJob {
///     type Result = ();
///
///     async fn execute(&self, _ctx: &JobContext) -> JobResult<Self::Result> {
///         println!("pinging {}", self.target);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static {
    /// The result type returned by this job.
    type Result: Send + Sync;

    /// Execute the job.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails; the runner retries the job
    /// according to `max_attempts()` with exponential backoff.
    async fn execute(&self, ctx: &JobContext) -> JobResult<Self::Result>;

    /// Total number of attempts before the job is dead-lettered, the first
    /// execution included.
    ///
    /// Default: 3 attempts.
    fn max_attempts(&self) -> u32 {
        3
    }

    /// Timeout for one execution attempt.
    ///
    /// Default: 30 seconds.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Job type name for logging and dead-letter listings.
    fn job_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_uniqueness() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_id_display_parses_back() {
        let id = JobId::new();
        let display = format!("{id}");
        assert_eq!(&Uuid::parse_str(&display).unwrap(), id.as_uuid());
    }
}
