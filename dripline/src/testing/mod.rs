//! Test doubles for the outreach subsystem.
//!
//! An in-memory store, a capturing transport with per-recipient failure
//! injection, a resolver that always returns the same transport, and a
//! scheduler that records instead of enqueueing. Used by this crate's own
//! tests and available to embedding applications.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::email::{Email, EmailError, EmailTransport, TransportResolver};
use crate::jobs::{JobId, JobResult};
use crate::outreach::{SequenceStepJob, StepScheduler};
use crate::store::{
    Campaign, CampaignStatus, DelayUnit, NewTrackingRecord, OutreachStore, Sequence,
    SequenceStep, StoreError, TrackingRecord, TrackingStatus,
};

#[derive(Default)]
struct MemoryInner {
    campaigns: HashMap<i64, Campaign>,
    sequences: HashMap<i64, Sequence>,
    steps: Vec<SequenceStep>,
    tracking: Vec<TrackingRecord>,
    next_id: i64,
    fail_writes: bool,
}

/// In-memory [`OutreachStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pending campaign.
    pub fn seed_campaign(&self, id: i64, from_account: &str) {
        self.inner.lock().campaigns.insert(
            id,
            Campaign {
                id,
                user_id: 1,
                from_account: from_account.to_string(),
                subject: "Subject".to_string(),
                body: "<p>Body</p>".to_string(),
                scheduled_at: None,
                status: CampaignStatus::Pending,
            },
        );
    }

    /// Seed a sequence.
    pub fn seed_sequence(&self, id: i64, from_account: &str) {
        self.inner.lock().sequences.insert(
            id,
            Sequence {
                id,
                user_id: 1,
                name: format!("sequence-{id}"),
                from_account: from_account.to_string(),
            },
        );
    }

    /// Seed a step at a position within a sequence.
    pub fn seed_step(&self, sequence_id: i64, position: i32, delay_amount: i64, delay_unit: DelayUnit) {
        let mut inner = self.inner.lock();
        let id = i64::try_from(inner.steps.len()).unwrap_or_default() + 1;
        inner.steps.push(SequenceStep {
            id,
            sequence_id,
            subject: format!("Step {position}"),
            body: format!("<p>Step {position} body</p>"),
            delay_amount,
            delay_unit,
            position,
        });
    }

    /// Make every write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Snapshot of all tracking rows, in insertion order.
    #[must_use]
    pub fn tracking(&self) -> Vec<TrackingRecord> {
        self.inner.lock().tracking.clone()
    }

    /// Current status of a seeded campaign.
    #[must_use]
    pub fn campaign_status(&self, id: i64) -> Option<CampaignStatus> {
        self.inner.lock().campaigns.get(&id).map(|c| c.status)
    }
}

#[async_trait]
impl OutreachStore for MemoryStore {
    async fn campaign(&self, id: i64) -> Result<Option<Campaign>, StoreError> {
        Ok(self.inner.lock().campaigns.get(&id).cloned())
    }

    async fn update_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        if let Some(campaign) = inner.campaigns.get_mut(&id) {
            campaign.status = status;
        }
        Ok(())
    }

    async fn sequence(&self, id: i64) -> Result<Option<Sequence>, StoreError> {
        Ok(self.inner.lock().sequences.get(&id).cloned())
    }

    async fn sequence_step(
        &self,
        sequence_id: i64,
        position: i32,
    ) -> Result<Option<SequenceStep>, StoreError> {
        Ok(self
            .inner
            .lock()
            .steps
            .iter()
            .find(|s| s.sequence_id == sequence_id && s.position == position)
            .cloned())
    }

    async fn insert_tracking(&self, record: NewTrackingRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        let bounced_at = match record.status {
            TrackingStatus::Bounced => Some(now),
            TrackingStatus::Sent => None,
        };

        inner.tracking.push(TrackingRecord {
            id,
            campaign_id: record.campaign_id,
            sequence_id: record.sequence_id,
            step: record.step,
            recipient: record.recipient,
            status: record.status,
            sent_at: now,
            opened_at: None,
            clicked_at: None,
            replied_at: None,
            bounced_at,
        });

        Ok(id)
    }
}

/// Transport that records sent emails and can fail for chosen recipients.
pub struct CapturingTransport {
    sent: Mutex<Vec<Email>>,
    failing: Mutex<HashSet<String>>,
    verifies: Mutex<bool>,
}

impl CapturingTransport {
    /// Create a transport that accepts everything and verifies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            verifies: Mutex::new(true),
        }
    }

    /// Fail every send addressed to `recipient`.
    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().insert(recipient.to_string());
    }

    /// Set the verification handshake result.
    pub fn set_verifies(&self, verifies: bool) {
        *self.verifies.lock() = verifies;
    }

    /// Number of emails accepted.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// All accepted emails, in send order.
    #[must_use]
    pub fn sent_emails(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }

    /// Whether an email was accepted for `address`.
    #[must_use]
    pub fn was_sent_to(&self, address: &str) -> bool {
        self.sent
            .lock()
            .iter()
            .any(|email| email.to.iter().any(|to| to == address))
    }
}

#[async_trait]
impl EmailTransport for CapturingTransport {
    async fn send(&self, email: Email) -> Result<(), EmailError> {
        email.validate()?;

        if email
            .to
            .iter()
            .any(|to| self.failing.lock().contains(to))
        {
            return Err(EmailError::smtp("simulated delivery failure"));
        }

        self.sent.lock().push(email);
        Ok(())
    }

    async fn verify(&self) -> Result<bool, EmailError> {
        Ok(*self.verifies.lock())
    }
}

/// Resolver that returns the same transport for every account.
pub struct StaticResolver {
    transport: Arc<dyn EmailTransport>,
}

impl StaticResolver {
    /// Wrap a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }
}

impl TransportResolver for StaticResolver {
    fn resolve(&self, _account: &str) -> Result<Arc<dyn EmailTransport>, EmailError> {
        Ok(Arc::clone(&self.transport))
    }
}

/// Step scheduler that records scheduled jobs instead of enqueueing them.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(SequenceStepJob, Duration)>>,
}

impl RecordingScheduler {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs scheduled so far, with their delays.
    #[must_use]
    pub fn scheduled(&self) -> Vec<(SequenceStepJob, Duration)> {
        self.scheduled.lock().clone()
    }
}

#[async_trait]
impl StepScheduler for RecordingScheduler {
    async fn schedule(&self, job: SequenceStepJob, delay: Duration) -> JobResult<JobId> {
        self.scheduled.lock().push((job, delay));
        Ok(JobId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capturing_transport_records_sends() {
        let transport = CapturingTransport::new();

        let email = Email::new()
            .to("user@example.com")
            .from("noreply@myapp.com")
            .subject("Test")
            .text("Hello");

        transport.send(email).await.unwrap();

        assert_eq!(transport.sent_count(), 1);
        assert!(transport.was_sent_to("user@example.com"));
    }

    #[tokio::test]
    async fn test_capturing_transport_failure_injection() {
        let transport = CapturingTransport::new();
        transport.fail_for("bad@example.com");

        let email = Email::new()
            .to("bad@example.com")
            .from("noreply@myapp.com")
            .subject("Test")
            .text("Hello");

        assert!(transport.send(email).await.is_err());
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_tracks_inserts() {
        let store = MemoryStore::new();
        store.seed_campaign(5, "sales@myapp.com");

        store
            .insert_tracking(NewTrackingRecord::campaign_sent(5, "a@example.com"))
            .await
            .unwrap();
        store
            .insert_tracking(NewTrackingRecord::campaign_bounced(5, "b@example.com"))
            .await
            .unwrap();

        let tracking = store.tracking();
        assert_eq!(tracking.len(), 2);
        assert_eq!(tracking[0].status, TrackingStatus::Sent);
        assert!(tracking[0].bounced_at.is_none());
        assert_eq!(tracking[1].status, TrackingStatus::Bounced);
        assert!(tracking[1].bounced_at.is_some());
    }

    #[tokio::test]
    async fn test_memory_store_write_failure_injection() {
        let store = MemoryStore::new();
        store.fail_writes(true);

        let result = store
            .insert_tracking(NewTrackingRecord::campaign_sent(1, "a@example.com"))
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
