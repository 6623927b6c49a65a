//! Single-consumer queue runner with retry and backoff.
//!
//! One runner task polls one queue. A failed or timed-out attempt is
//! re-enqueued with exponential backoff (base * 2^(attempt - 1)) until the
//! job's attempt budget is exhausted, at which point the job is
//! dead-lettered. Runners stop through a shared watch channel.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{Job, JobContext, JobError, JobQueue};
use crate::jobs::queue::QueuedEntry;

/// Default queue poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default first-retry backoff.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Polls a [`JobQueue`] and executes due jobs one at a time.
pub struct JobRunner<J: Job> {
    queue: JobQueue<J>,
    ctx: JobContext,
    poll_interval: Duration,
    retry_base: Duration,
}

impl<J: Job> JobRunner<J> {
    /// Create a runner over a queue with default pacing.
    #[must_use]
    pub fn new(queue: JobQueue<J>, ctx: JobContext) -> Self {
        Self {
            queue,
            ctx,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the first-retry backoff.
    #[must_use]
    pub const fn retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Spawn the runner loop. The task drains due jobs each poll tick and
    /// exits when the shutdown channel flips to `true` or closes.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(queue = %self.queue.name(), "job runner started");

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    () = tokio::time::sleep(self.poll_interval) => {
                        while let Some(entry) = self.queue.pop_due() {
                            self.process(entry).await;
                        }
                    }
                }
            }

            info!(queue = %self.queue.name(), "job runner stopped");
        })
    }

    async fn process(&self, mut entry: QueuedEntry<J>) {
        let timeout = entry.job.timeout();

        self.queue.mark_running(entry.id);
        debug!(
            queue = %self.queue.name(),
            job = %entry.id,
            job_type = entry.job.job_type(),
            attempt = entry.attempt + 1,
            "executing job"
        );

        let outcome = match tokio::time::timeout(timeout, entry.job.execute(&self.ctx)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(JobError::Timeout(timeout)),
        };

        entry.attempt += 1;

        match outcome {
            Ok(()) => {
                self.queue.mark_completed(entry.id);
                debug!(queue = %self.queue.name(), job = %entry.id, "job completed");
            }
            Err(err) if entry.attempt < entry.job.max_attempts() => {
                let backoff = self.retry_base * 2_u32.saturating_pow(entry.attempt - 1);
                error!(
                    queue = %self.queue.name(),
                    job = %entry.id,
                    attempt = entry.attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "job attempt failed, retrying"
                );
                self.queue
                    .mark_retrying(entry.id, entry.attempt, &err.to_string(), backoff);
                self.queue.requeue(entry, backoff);
            }
            Err(err) => {
                error!(
                    queue = %self.queue.name(),
                    job = %entry.id,
                    attempts = entry.attempt,
                    error = %err,
                    "job failed permanently"
                );
                self.queue.bury(&entry, &err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobResult, JobStatus};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};

    static EXECUTIONS: AtomicU32 = AtomicU32::new(0);

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct AlwaysFails;

    #[async_trait]
    impl Job for AlwaysFails {
        type Result = ();

        async fn execute(&self, _ctx: &JobContext) -> JobResult<Self::Result> {
            EXECUTIONS.fetch_add(1, Ordering::SeqCst);
            Err(JobError::ExecutionFailed("always fails".to_string()))
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CountingJob;

    #[async_trait]
    impl Job for CountingJob {
        type Result = u32;

        async fn execute(&self, _ctx: &JobContext) -> JobResult<Self::Result> {
            Ok(1)
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..2_000 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_job_completes() {
        let queue: JobQueue<CountingJob> = JobQueue::new("ok", 16);
        let (_tx, rx) = watch::channel(false);
        let _handle = JobRunner::new(queue.clone(), JobContext::new()).spawn(rx);

        let id = queue.enqueue(CountingJob).unwrap();

        let q = queue.clone();
        wait_until(move || q.metrics().completed == 1).await;
        assert!(matches!(queue.status(id), Some(JobStatus::Completed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_job_runs_three_times_then_dead_letters() {
        EXECUTIONS.store(0, Ordering::SeqCst);

        let queue: JobQueue<AlwaysFails> = JobQueue::new("flaky", 16);
        let (_tx, rx) = watch::channel(false);
        let _handle = JobRunner::new(queue.clone(), JobContext::new())
            .retry_base(Duration::from_secs(1))
            .spawn(rx);

        let id = queue.enqueue(AlwaysFails).unwrap();

        let q = queue.clone();
        wait_until(move || q.metrics().failed == 1).await;

        assert_eq!(EXECUTIONS.load(Ordering::SeqCst), 3);
        assert_eq!(queue.metrics().retried, 2);

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, id);
        assert_eq!(dead[0].attempts, 3);
        assert!(dead[0].error.contains("always fails"));
        assert!(matches!(
            queue.status(id),
            Some(JobStatus::Failed { attempts: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_runner() {
        let queue: JobQueue<CountingJob> = JobQueue::new("stop", 16);
        let (tx, rx) = watch::channel(false);
        let handle = JobRunner::new(queue, JobContext::new()).spawn(rx);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
