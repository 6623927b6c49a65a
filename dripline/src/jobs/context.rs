//! Job execution context with access to shared services.
//!
//! Jobs stay serializable. The services they need (the outreach store, the
//! transport resolver, the step scheduler) are injected at execution time
//! through cheap `Arc` clones of this context. All services are optional so
//! partial deployments and tests configure only what they use.

use std::sync::Arc;

use crate::email::TransportResolver;
use crate::outreach::StepScheduler;
use crate::store::OutreachStore;

/// Context provided to jobs during execution.
#[derive(Clone, Default)]
pub struct JobContext {
    store: Option<Arc<dyn OutreachStore>>,
    transports: Option<Arc<dyn TransportResolver>>,
    steps: Option<Arc<dyn StepScheduler>>,
}

impl JobContext {
    /// Create a context with all services absent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outreach store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn OutreachStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the transport resolver.
    #[must_use]
    pub fn with_transports(mut self, transports: Arc<dyn TransportResolver>) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Set the sequence step scheduler.
    #[must_use]
    pub fn with_step_scheduler(mut self, steps: Arc<dyn StepScheduler>) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Get the outreach store if available.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn OutreachStore>> {
        self.store.as_ref()
    }

    /// Get the transport resolver if available.
    #[must_use]
    pub fn transports(&self) -> Option<&Arc<dyn TransportResolver>> {
        self.transports.as_ref()
    }

    /// Get the step scheduler if available.
    #[must_use]
    pub fn step_scheduler(&self) -> Option<&Arc<dyn StepScheduler>> {
        self.steps.as_ref()
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("store", &self.store.is_some())
            .field("transports", &self.transports.is_some())
            .field("steps", &self.steps.is_some())
            .finish()
    }
}
