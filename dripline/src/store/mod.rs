//! Outreach data access: campaigns, sequences, steps, and tracking records.
//!
//! The subsystem reads campaign/sequence definitions and appends tracking
//! rows; everything else about these entities (authoring, reporting) belongs
//! to the web tier. Access goes through the [`OutreachStore`] trait so the
//! job handlers can run against Postgres in production and an in-memory
//! double in tests.

mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from the underlying pool.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded into its domain type.
    #[error("invalid stored value: {0}")]
    Decode(String),

    /// The store rejected the operation (used by test doubles to simulate
    /// write failures).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Created but not yet launched.
    Pending,
    /// Currently being delivered.
    Active,
    /// All recipients processed.
    Completed,
    /// Launch deferred to a scheduled time.
    Scheduled,
}

impl CampaignStatus {
    /// Database representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Scheduled => "scheduled",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(StoreError::Decode(format!("campaign status: {other}"))),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded for one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    /// The transport accepted the message.
    Sent,
    /// The attempt failed; recorded with a bounce timestamp.
    Bounced,
}

impl TrackingStatus {
    /// Database representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Bounced => "bounced",
        }
    }
}

impl FromStr for TrackingStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "bounced" => Ok(Self::Bounced),
            other => Err(StoreError::Decode(format!("tracking status: {other}"))),
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit of a sequence step's delay interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    /// Whole hours.
    Hours,
    /// Whole 24-hour days; no calendar awareness.
    Days,
}

impl DelayUnit {
    /// Database representation of the unit.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    /// Seconds in one unit.
    #[must_use]
    pub const fn seconds(&self) -> u64 {
        match self {
            Self::Hours => 3_600,
            Self::Days => 86_400,
        }
    }
}

impl FromStr for DelayUnit {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            other => Err(StoreError::Decode(format!("delay unit: {other}"))),
        }
    }
}

impl fmt::Display for DelayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A one-shot batch email send to a recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identifier.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Sender account identifier (also the From header).
    pub from_account: String,
    /// Email subject.
    pub subject: String,
    /// Email body (HTML).
    pub body: String,
    /// Deferred launch time, if scheduled.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: CampaignStatus,
}

/// A named, ordered set of drip-email steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence identifier.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Sender account identifier for every step.
    pub from_account: String,
}

/// One email within a sequence, identified by its 1-based position.
///
/// Positions are unique and contiguous within a sequence; the step handler
/// relies on `position = current + 1` lookups returning a row or a clean
/// "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    /// Step identifier.
    pub id: i64,
    /// Parent sequence.
    pub sequence_id: i64,
    /// Email subject.
    pub subject: String,
    /// Email body (HTML).
    pub body: String,
    /// Delay before this step fires, counted from the previous step's send.
    pub delay_amount: i64,
    /// Unit of `delay_amount`.
    pub delay_unit: DelayUnit,
    /// 1-based position within the sequence.
    pub position: i32,
}

/// An append-only log entry capturing the outcome of one send attempt.
///
/// Every attempt produces a new row, retries included; there is no
/// deduplication by (recipient, step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Record identifier.
    pub id: i64,
    /// Parent campaign, for campaign sends.
    pub campaign_id: Option<i64>,
    /// Parent sequence, for sequence sends.
    pub sequence_id: Option<i64>,
    /// Step position, for sequence sends.
    pub step: Option<i32>,
    /// Recipient address.
    pub recipient: String,
    /// Attempt outcome.
    pub status: TrackingStatus,
    /// When the attempt was made.
    pub sent_at: DateTime<Utc>,
    /// Engagement timestamps, populated by the (out-of-scope) event layer.
    pub opened_at: Option<DateTime<Utc>>,
    /// See `opened_at`.
    pub clicked_at: Option<DateTime<Utc>>,
    /// See `opened_at`.
    pub replied_at: Option<DateTime<Utc>>,
    /// When the bounce was recorded, for bounced attempts.
    pub bounced_at: Option<DateTime<Utc>>,
}

/// A tracking row about to be appended. The store stamps `sent_at` and, for
/// bounced attempts, `bounced_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackingRecord {
    /// Parent campaign, for campaign sends.
    pub campaign_id: Option<i64>,
    /// Parent sequence, for sequence sends.
    pub sequence_id: Option<i64>,
    /// Step position, for sequence sends.
    pub step: Option<i32>,
    /// Recipient address.
    pub recipient: String,
    /// Attempt outcome.
    pub status: TrackingStatus,
}

impl NewTrackingRecord {
    /// A successful campaign send.
    #[must_use]
    pub fn campaign_sent(campaign_id: i64, recipient: &str) -> Self {
        Self {
            campaign_id: Some(campaign_id),
            sequence_id: None,
            step: None,
            recipient: recipient.to_string(),
            status: TrackingStatus::Sent,
        }
    }

    /// A failed campaign send.
    #[must_use]
    pub fn campaign_bounced(campaign_id: i64, recipient: &str) -> Self {
        Self {
            status: TrackingStatus::Bounced,
            ..Self::campaign_sent(campaign_id, recipient)
        }
    }

    /// A successful sequence-step send.
    #[must_use]
    pub fn sequence_sent(sequence_id: i64, step: i32, recipient: &str) -> Self {
        Self {
            campaign_id: None,
            sequence_id: Some(sequence_id),
            step: Some(step),
            recipient: recipient.to_string(),
            status: TrackingStatus::Sent,
        }
    }

    /// A failed sequence-step send.
    #[must_use]
    pub fn sequence_bounced(sequence_id: i64, step: i32, recipient: &str) -> Self {
        Self {
            status: TrackingStatus::Bounced,
            ..Self::sequence_sent(sequence_id, step, recipient)
        }
    }
}

/// Data access surface used by the outreach job handlers.
#[async_trait]
pub trait OutreachStore: Send + Sync {
    /// Load a campaign by id.
    async fn campaign(&self, id: i64) -> Result<Option<Campaign>, StoreError>;

    /// Update a campaign's lifecycle status.
    async fn update_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
    ) -> Result<(), StoreError>;

    /// Load a sequence by id.
    async fn sequence(&self, id: i64) -> Result<Option<Sequence>, StoreError>;

    /// Load the step at a 1-based position within a sequence.
    async fn sequence_step(
        &self,
        sequence_id: i64,
        position: i32,
    ) -> Result<Option<SequenceStep>, StoreError>;

    /// Append one tracking row and return its id.
    async fn insert_tracking(&self, record: NewTrackingRecord) -> Result<i64, StoreError>;
}
