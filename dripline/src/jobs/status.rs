//! Job status tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Queued and waiting to be executed.
    Pending,

    /// Currently being executed.
    Running {
        /// When the attempt started.
        started_at: DateTime<Utc>,
    },

    /// Completed successfully.
    Completed {
        /// When the job completed.
        completed_at: DateTime<Utc>,
    },

    /// Failed and waiting for a retry.
    Retrying {
        /// Attempts made so far.
        attempt: u32,
        /// When the last attempt failed.
        failed_at: DateTime<Utc>,
        /// When the next attempt is due.
        retry_at: DateTime<Utc>,
        /// Error message from the last failure.
        error: String,
    },

    /// Failed permanently after exhausting its attempt budget.
    Failed {
        /// When the final attempt failed.
        failed_at: DateTime<Utc>,
        /// Attempts made.
        attempts: u32,
        /// Final error message.
        error: String,
    },
}

impl JobStatus {
    /// Whether the job is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Human-readable status name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running { .. } => "running",
            Self::Completed { .. } => "completed",
            Self::Retrying { .. } => "retrying",
            Self::Failed { .. } => "failed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running {
            started_at: Utc::now()
        }
        .is_terminal());
        assert!(JobStatus::Completed {
            completed_at: Utc::now()
        }
        .is_terminal());
        assert!(JobStatus::Failed {
            failed_at: Utc::now(),
            attempts: 3,
            error: "boom".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", JobStatus::Pending), "pending");
    }
}
