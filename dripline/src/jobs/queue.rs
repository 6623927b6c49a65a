//! Delay-aware in-memory job queue.
//!
//! Jobs are ordered by due time in a binary heap; a delayed enqueue simply
//! pushes an entry whose due time lies in the future. The queue tracks
//! per-job status, running counters, and a retained dead-letter list:
//! failed jobs are kept for operator inspection, never purged automatically.
//!
//! Scheduling uses the tokio clock so paused-time tests can drive delays
//! deterministically.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Job, JobError, JobId, JobResult, JobStatus};

/// A job waiting in the queue.
pub(crate) struct QueuedEntry<J> {
    /// Unique job identifier.
    pub(crate) id: JobId,
    /// The job payload.
    pub(crate) job: J,
    /// When the job becomes due.
    pub(crate) run_at: Instant,
    /// When the job was first enqueued (FIFO tiebreak).
    pub(crate) enqueued_at: Instant,
    /// Attempts already made (0 = not yet executed).
    pub(crate) attempt: u32,
}

impl<J> PartialEq for QueuedEntry<J> {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.enqueued_at == other.enqueued_at
    }
}

impl<J> Eq for QueuedEntry<J> {}

impl<J> PartialOrd for QueuedEntry<J> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<J> Ord for QueuedEntry<J> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earliest due time first; if equal, older enqueues first (FIFO).
        match other.run_at.cmp(&self.run_at) {
            Ordering::Equal => other.enqueued_at.cmp(&self.enqueued_at),
            ord => ord,
        }
    }
}

/// Counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetrics {
    /// Jobs accepted into the queue.
    pub enqueued: u64,
    /// Jobs that completed successfully.
    pub completed: u64,
    /// Retry attempts scheduled.
    pub retried: u64,
    /// Jobs dead-lettered after exhausting their attempt budget.
    pub failed: u64,
    /// Enqueues rejected because the queue was full.
    pub rejected: u64,
}

/// A permanently failed job retained for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    /// Job identifier.
    pub id: JobId,
    /// Job type name.
    pub job_type: String,
    /// Serialized job payload.
    pub payload: serde_json::Value,
    /// Final error message.
    pub error: String,
    /// Attempts made.
    pub attempts: u32,
    /// When the final attempt failed.
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

struct Pending<J> {
    heap: BinaryHeap<QueuedEntry<J>>,
    ids: HashSet<JobId>,
}

struct QueueInner<J> {
    name: String,
    max_size: usize,
    pending: RwLock<Pending<J>>,
    statuses: RwLock<HashMap<JobId, JobStatus>>,
    dead: RwLock<Vec<DeadLetter>>,
    metrics: RwLock<JobMetrics>,
}

/// Delay-aware job queue. Clones share the same underlying queue.
pub struct JobQueue<J: Job> {
    inner: Arc<QueueInner<J>>,
}

impl<J: Job> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: Job> JobQueue<J> {
    /// Create a queue with the given name and capacity.
    #[must_use]
    pub fn new(name: &str, max_size: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                name: name.to_string(),
                max_size,
                pending: RwLock::new(Pending {
                    heap: BinaryHeap::new(),
                    ids: HashSet::new(),
                }),
                statuses: RwLock::new(HashMap::new()),
                dead: RwLock::new(Vec::new()),
                metrics: RwLock::new(JobMetrics::default()),
            }),
        }
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of jobs waiting (due or delayed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.pending.read().heap.len()
    }

    /// Whether the queue has no waiting jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueue a job for immediate execution.
    pub fn enqueue(&self, job: J) -> JobResult<JobId> {
        self.enqueue_after(job, Duration::ZERO)
    }

    /// Enqueue a job that becomes due after `delay`.
    pub fn enqueue_after(&self, job: J, delay: Duration) -> JobResult<JobId> {
        let id = JobId::new();
        let now = Instant::now();

        {
            let mut pending = self.inner.pending.write();
            if pending.heap.len() >= self.inner.max_size {
                self.inner.metrics.write().rejected += 1;
                warn!(queue = %self.inner.name, job = %id, "enqueue rejected: queue full");
                return Err(JobError::QueueFull {
                    queue: self.inner.name.clone(),
                    max: self.inner.max_size,
                });
            }

            pending.ids.insert(id);
            pending.heap.push(QueuedEntry {
                id,
                job,
                run_at: now + delay,
                enqueued_at: now,
                attempt: 0,
            });
        }

        self.inner.statuses.write().insert(id, JobStatus::Pending);
        self.inner.metrics.write().enqueued += 1;
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(queue = %self.inner.name, job = %id, delay_ms, "job enqueued");

        Ok(id)
    }

    /// Whether a job is still waiting in the queue.
    #[must_use]
    pub fn contains(&self, id: JobId) -> bool {
        self.inner.pending.read().ids.contains(&id)
    }

    /// Pop the next due job, if any.
    pub(crate) fn pop_due(&self) -> Option<QueuedEntry<J>> {
        let now = Instant::now();
        let mut pending = self.inner.pending.write();

        if pending.heap.peek().is_some_and(|entry| entry.run_at <= now) {
            let entry = pending.heap.pop()?;
            pending.ids.remove(&entry.id);
            Some(entry)
        } else {
            None
        }
    }

    /// Put a popped entry back with a new due time (retry path). Retries
    /// bypass the capacity check so a full queue cannot drop work in flight.
    pub(crate) fn requeue(&self, mut entry: QueuedEntry<J>, delay: Duration) {
        entry.run_at = Instant::now() + delay;

        let mut pending = self.inner.pending.write();
        pending.ids.insert(entry.id);
        pending.heap.push(entry);
    }

    /// Record a job as running.
    pub(crate) fn mark_running(&self, id: JobId) {
        self.inner.statuses.write().insert(
            id,
            JobStatus::Running {
                started_at: chrono::Utc::now(),
            },
        );
    }

    /// Record a job as completed.
    pub(crate) fn mark_completed(&self, id: JobId) {
        self.inner.statuses.write().insert(
            id,
            JobStatus::Completed {
                completed_at: chrono::Utc::now(),
            },
        );
        self.inner.metrics.write().completed += 1;
    }

    /// Record a failed attempt that will be retried.
    pub(crate) fn mark_retrying(&self, id: JobId, attempt: u32, error: &str, retry_in: Duration) {
        let failed_at = chrono::Utc::now();
        let retry_at = failed_at
            + chrono::Duration::from_std(retry_in).unwrap_or_else(|_| chrono::Duration::zero());

        self.inner.statuses.write().insert(
            id,
            JobStatus::Retrying {
                attempt,
                failed_at,
                retry_at,
                error: error.to_string(),
            },
        );
        self.inner.metrics.write().retried += 1;
    }

    /// Move a job to the dead-letter list after its final failed attempt.
    pub(crate) fn bury(&self, entry: &QueuedEntry<J>, error: &str) {
        let failed_at = chrono::Utc::now();

        self.inner.statuses.write().insert(
            entry.id,
            JobStatus::Failed {
                failed_at,
                attempts: entry.attempt,
                error: error.to_string(),
            },
        );

        self.inner.dead.write().push(DeadLetter {
            id: entry.id,
            job_type: entry.job.job_type().to_string(),
            payload: serde_json::to_value(&entry.job).unwrap_or(serde_json::Value::Null),
            error: error.to_string(),
            attempts: entry.attempt,
            failed_at,
        });

        self.inner.metrics.write().failed += 1;
        warn!(
            queue = %self.inner.name,
            job = %entry.id,
            attempts = entry.attempt,
            error = %error,
            "job dead-lettered"
        );
    }

    /// Status of a job known to this queue.
    #[must_use]
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.inner.statuses.read().get(&id).cloned()
    }

    /// Snapshot of the queue counters.
    #[must_use]
    pub fn metrics(&self) -> JobMetrics {
        *self.inner.metrics.read()
    }

    /// Retained dead letters, oldest first.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobContext;
    use async_trait::async_trait;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct NoopJob;

    #[async_trait]
    impl Job for NoopJob {
        type Result = ();

        async fn execute(&self, _ctx: &JobContext) -> JobResult<Self::Result> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_jobs_pop_in_fifo_order() {
        let queue = JobQueue::new("test", 16);

        let first = queue.enqueue(NoopJob).unwrap();
        let second = queue.enqueue(NoopJob).unwrap();

        assert_eq!(queue.pop_due().unwrap().id, first);
        assert_eq!(queue.pop_due().unwrap().id, second);
        assert!(queue.pop_due().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_job_not_due_until_delay_elapses() {
        let queue = JobQueue::new("test", 16);

        let id = queue
            .enqueue_after(NoopJob, Duration::from_secs(3_600))
            .unwrap();

        assert!(queue.pop_due().is_none());
        assert!(queue.contains(id));

        tokio::time::advance(Duration::from_secs(3_600)).await;

        assert_eq!(queue.pop_due().unwrap().id, id);
        assert!(!queue.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_due_time_wins_over_enqueue_order() {
        let queue = JobQueue::new("test", 16);

        let slow = queue
            .enqueue_after(NoopJob, Duration::from_secs(60))
            .unwrap();
        let fast = queue
            .enqueue_after(NoopJob, Duration::from_secs(10))
            .unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(queue.pop_due().unwrap().id, fast);
        assert_eq!(queue.pop_due().unwrap().id, slow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_rejected_when_full() {
        let queue = JobQueue::new("tiny", 1);

        queue.enqueue(NoopJob).unwrap();
        let err = queue.enqueue(NoopJob).unwrap_err();

        assert!(matches!(err, JobError::QueueFull { max: 1, .. }));
        assert_eq!(queue.metrics().rejected, 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_tracks_lifecycle() {
        let queue = JobQueue::new("test", 16);

        let id = queue.enqueue(NoopJob).unwrap();
        assert_eq!(queue.status(id), Some(JobStatus::Pending));

        let entry = queue.pop_due().unwrap();
        queue.mark_running(id);
        assert!(matches!(queue.status(id), Some(JobStatus::Running { .. })));

        queue.mark_completed(entry.id);
        assert!(queue.status(id).is_some_and(|s| s.is_terminal()));
        assert_eq!(queue.metrics().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bury_retains_payload_and_error() {
        let queue = JobQueue::new("test", 16);

        queue.enqueue(NoopJob).unwrap();
        let mut entry = queue.pop_due().unwrap();
        entry.attempt = 3;
        queue.bury(&entry, "smtp exploded");

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 3);
        assert_eq!(dead[0].error, "smtp exploded");
        assert!(dead[0].job_type.contains("NoopJob"));
        assert_eq!(queue.metrics().failed, 1);
    }
}
