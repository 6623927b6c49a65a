//! Background job processing.
//!
//! Durable-queue semantics in process: typed job payloads via the [`Job`]
//! trait, delay-aware queues, a single consumer task per queue, automatic
//! retry with exponential backoff (3 attempts, 1s base), a retained
//! dead-letter list, and per-job status plus counters.
//!
//! # Example
//!
//! ```rust,no_run
//! use dripline::jobs::{Job, JobContext, JobQueue, JobResult, JobRunner};
//! use async_trait::async_trait;
//! use serde::{Deserialize, Serialize};
//! use tokio::sync::watch;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct WelcomeJob {
//!     user_id: i64,
//! }
//!
//! #[async_trait]
//! impl Job for WelcomeJob {
//!     type Result = ();
//!
//!     async fn execute(&self, _ctx: &JobContext) -> JobResult<Self::Result> {
//!         Ok(())
//!     }
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let queue: JobQueue<WelcomeJob> = JobQueue::new("welcome", 10_000);
//! let (shutdown, rx) = watch::channel(false);
//! let handle = JobRunner::new(queue.clone(), JobContext::new()).spawn(rx);
//! queue.enqueue(WelcomeJob { user_id: 7 })?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod job;
pub(crate) mod queue;
mod runner;
mod status;

pub use context::JobContext;
pub use error::{JobError, JobResult};
pub use job::{Job, JobId};
pub use queue::{DeadLetter, JobMetrics, JobQueue};
pub use runner::{JobRunner, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_BASE};
pub use status::JobStatus;
