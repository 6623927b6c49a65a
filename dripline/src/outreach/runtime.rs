//! Composition root for the delivery worker.
//!
//! Owns the campaign and sequence queues, their runner tasks, and the
//! shutdown channel. The embedding application enqueues work through
//! [`OutreachRuntime::launch_campaign`] and
//! [`OutreachRuntime::start_sequence`]; sequence continuation jobs are
//! scheduled internally by the step handler.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::{SendCampaignJob, SequenceStepJob};
use crate::config::WorkerSettings;
use crate::email::TransportResolver;
use crate::jobs::{JobContext, JobId, JobQueue, JobResult, JobRunner};
use crate::store::OutreachStore;

/// Running delivery worker: two queues, two runner tasks.
pub struct OutreachRuntime {
    campaigns: JobQueue<SendCampaignJob>,
    sequences: JobQueue<SequenceStepJob>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl OutreachRuntime {
    /// Wire the queues and spawn the runners.
    #[must_use]
    pub fn start(
        store: Arc<dyn OutreachStore>,
        transports: Arc<dyn TransportResolver>,
        settings: &WorkerSettings,
    ) -> Self {
        let campaigns: JobQueue<SendCampaignJob> =
            JobQueue::new("campaigns", settings.queue_capacity);
        let sequences: JobQueue<SequenceStepJob> =
            JobQueue::new("sequences", settings.queue_capacity);

        let ctx = JobContext::new()
            .with_store(store)
            .with_transports(transports)
            .with_step_scheduler(Arc::new(sequences.clone()));

        let poll_interval = Duration::from_millis(settings.poll_interval_ms);
        let retry_base = Duration::from_millis(settings.retry_base_ms);

        let (shutdown, rx) = watch::channel(false);

        let handles = vec![
            JobRunner::new(campaigns.clone(), ctx.clone())
                .poll_interval(poll_interval)
                .retry_base(retry_base)
                .spawn(rx.clone()),
            JobRunner::new(sequences.clone(), ctx)
                .poll_interval(poll_interval)
                .retry_base(retry_base)
                .spawn(rx),
        ];

        info!(
            queue_capacity = settings.queue_capacity,
            poll_interval_ms = settings.poll_interval_ms,
            "outreach runtime started"
        );

        Self {
            campaigns,
            sequences,
            shutdown,
            handles,
        }
    }

    /// Enqueue a campaign batch for immediate delivery.
    pub fn launch_campaign(&self, job: SendCampaignJob) -> JobResult<JobId> {
        self.campaigns.enqueue(job)
    }

    /// Enqueue the first step of a sequence for one recipient.
    pub fn start_sequence(&self, job: SequenceStepJob) -> JobResult<JobId> {
        self.sequences.enqueue(job)
    }

    /// The campaign queue, for status and metrics inspection.
    #[must_use]
    pub const fn campaign_queue(&self) -> &JobQueue<SendCampaignJob> {
        &self.campaigns
    }

    /// The sequence queue, for status and metrics inspection.
    #[must_use]
    pub const fn sequence_queue(&self) -> &JobQueue<SequenceStepJob> {
        &self.sequences
    }

    /// Stop the runners and wait for them to finish their current job.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("outreach runtime stopped");
    }
}
