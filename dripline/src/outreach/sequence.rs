//! Drip-sequence step delivery job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

use super::{send_one, step_delay};
use crate::jobs::{Job, JobContext, JobError, JobId, JobQueue, JobResult};
use crate::store::NewTrackingRecord;

/// Schedules the follow-up job for a sequence recipient.
///
/// Implemented by the sequence job queue; test doubles record the scheduled
/// payloads instead.
#[async_trait]
pub trait StepScheduler: Send + Sync {
    /// Enqueue a step job that becomes due after `delay`.
    async fn schedule(&self, job: SequenceStepJob, delay: Duration) -> JobResult<JobId>;
}

#[async_trait]
impl StepScheduler for JobQueue<SequenceStepJob> {
    async fn schedule(&self, job: SequenceStepJob, delay: Duration) -> JobResult<JobId> {
        self.enqueue_after(job, delay)
    }
}

/// Send one sequence step to one recipient, then schedule the next step.
///
/// Missing sequence or step data is fatal for the job instance. A send
/// failure is recorded as a `bounced` tracking row and the sequence still
/// advances; only store failures ride the queue retry path. When no next
/// step exists the recipient's journey through the sequence ends with an
/// explicit [`SequenceAdvance::Done`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SequenceStepJob {
    /// Sequence being walked.
    pub sequence_id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Recipient walking the sequence.
    #[validate(email)]
    pub recipient: String,
    /// 1-based position of the step to send.
    #[validate(range(min = 1))]
    pub step: i32,
}

impl SequenceStepJob {
    /// The follow-up job for the next step.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            step: self.step + 1,
            ..self.clone()
        }
    }
}

/// Terminal-aware result of processing one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceAdvance {
    /// The next step was scheduled.
    Scheduled {
        /// Id of the enqueued follow-up job.
        job_id: JobId,
        /// Position of the scheduled step.
        next_step: i32,
        /// Delay before the scheduled step fires.
        delay: Duration,
    },
    /// No further step exists; the sequence is complete for this recipient.
    Done,
}

#[async_trait]
impl Job for SequenceStepJob {
    type Result = SequenceAdvance;

    async fn execute(&self, ctx: &JobContext) -> JobResult<Self::Result> {
        self.validate()
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

        let store = ctx
            .store()
            .ok_or(JobError::ServiceUnavailable("outreach store"))?;

        let sequence = store
            .sequence(self.sequence_id)
            .await?
            .ok_or_else(|| JobError::NotFound(format!("sequence {}", self.sequence_id)))?;

        let step = store
            .sequence_step(self.sequence_id, self.step)
            .await?
            .ok_or_else(|| {
                JobError::NotFound(format!(
                    "sequence {} step {}",
                    self.sequence_id, self.step
                ))
            })?;

        match send_one(
            ctx,
            &sequence.from_account,
            &self.recipient,
            &step.subject,
            &step.body,
        )
        .await
        {
            Ok(()) => {
                store
                    .insert_tracking(NewTrackingRecord::sequence_sent(
                        self.sequence_id,
                        self.step,
                        &self.recipient,
                    ))
                    .await?;
            }
            Err(err) => {
                warn!(
                    sequence = self.sequence_id,
                    step = self.step,
                    recipient = %self.recipient,
                    error = %err,
                    "sequence step bounced"
                );
                store
                    .insert_tracking(NewTrackingRecord::sequence_bounced(
                        self.sequence_id,
                        self.step,
                        &self.recipient,
                    ))
                    .await?;
            }
        }

        match store.sequence_step(self.sequence_id, self.step + 1).await? {
            Some(next_step) => {
                let delay = step_delay(
                    u64::try_from(next_step.delay_amount).unwrap_or_default(),
                    next_step.delay_unit,
                );
                let scheduler = ctx
                    .step_scheduler()
                    .ok_or(JobError::ServiceUnavailable("step scheduler"))?;

                let job_id = scheduler.schedule(self.next(), delay).await?;

                info!(
                    sequence = self.sequence_id,
                    recipient = %self.recipient,
                    next_step = next_step.position,
                    delay_secs = delay.as_secs(),
                    "next sequence step scheduled"
                );

                Ok(SequenceAdvance::Scheduled {
                    job_id,
                    next_step: next_step.position,
                    delay,
                })
            }
            None => {
                info!(
                    sequence = self.sequence_id,
                    recipient = %self.recipient,
                    last_step = self.step,
                    "sequence complete for recipient"
                );
                Ok(SequenceAdvance::Done)
            }
        }
    }

    fn job_type(&self) -> &'static str {
        "send_sequence_step"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DelayUnit;
    use crate::testing::{CapturingTransport, MemoryStore, RecordingScheduler, StaticResolver};
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        transport: Arc<CapturingTransport>,
        scheduler: Arc<RecordingScheduler>,
        ctx: JobContext,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(CapturingTransport::new());
        let scheduler = Arc::new(RecordingScheduler::new());

        let ctx = JobContext::new()
            .with_store(store.clone())
            .with_transports(Arc::new(StaticResolver::new(transport.clone())))
            .with_step_scheduler(scheduler.clone());

        Fixture {
            store,
            transport,
            scheduler,
            ctx,
        }
    }

    fn job(step: i32) -> SequenceStepJob {
        SequenceStepJob {
            sequence_id: 9,
            user_id: 1,
            recipient: "prospect@example.com".to_string(),
            step,
        }
    }

    #[tokio::test]
    async fn test_step_schedules_next_with_its_configured_delay() {
        let f = fixture();
        f.store.seed_sequence(9, "sales@myapp.com");
        f.store.seed_step(9, 1, 0, DelayUnit::Hours);
        f.store.seed_step(9, 2, 3, DelayUnit::Days);

        let advance = job(1).execute(&f.ctx).await.unwrap();

        let expected = step_delay(3, DelayUnit::Days);
        assert!(matches!(
            advance,
            SequenceAdvance::Scheduled { next_step: 2, delay, .. } if delay == expected
        ));

        let scheduled = f.scheduler.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0.step, 2);
        assert_eq!(scheduled[0].1, expected);
        assert_eq!(f.transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_last_step_terminates() {
        let f = fixture();
        f.store.seed_sequence(9, "sales@myapp.com");
        f.store.seed_step(9, 1, 1, DelayUnit::Days);

        let advance = job(1).execute(&f.ctx).await.unwrap();

        assert_eq!(advance, SequenceAdvance::Done);
        assert!(f.scheduler.scheduled().is_empty());
        assert_eq!(f.store.tracking().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_step_is_fatal() {
        let f = fixture();
        f.store.seed_sequence(9, "sales@myapp.com");

        let result = job(4).execute(&f.ctx).await;

        assert!(matches!(result, Err(JobError::NotFound(_))));
        assert_eq!(f.transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_sequence_is_fatal() {
        let f = fixture();

        let result = job(1).execute(&f.ctx).await;

        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_failure_records_bounce_and_still_advances() {
        let f = fixture();
        f.store.seed_sequence(9, "sales@myapp.com");
        f.store.seed_step(9, 1, 0, DelayUnit::Hours);
        f.store.seed_step(9, 2, 1, DelayUnit::Hours);
        f.transport.fail_for("prospect@example.com");

        let advance = job(1).execute(&f.ctx).await.unwrap();

        assert!(matches!(advance, SequenceAdvance::Scheduled { .. }));
        let tracking = f.store.tracking();
        assert_eq!(tracking.len(), 1);
        assert_eq!(
            tracking[0].status,
            crate::store::TrackingStatus::Bounced
        );
        assert!(tracking[0].bounced_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_step_number_rejected_before_io() {
        let f = fixture();

        let result = job(0).execute(&f.ctx).await;

        assert!(matches!(result, Err(JobError::InvalidPayload(_))));
    }
}
