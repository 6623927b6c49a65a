//! Postgres implementation of the outreach store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    Campaign, CampaignStatus, NewTrackingRecord, OutreachStore, Sequence, SequenceStep,
    StoreError, TrackingStatus,
};
use async_trait::async_trait;

/// Postgres-backed [`OutreachStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: i64,
    user_id: i64,
    from_account: String,
    subject: String,
    body: String,
    scheduled_at: Option<DateTime<Utc>>,
    status: String,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            from_account: row.from_account,
            subject: row.subject,
            body: row.body,
            scheduled_at: row.scheduled_at,
            status: row.status.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SequenceRow {
    id: i64,
    user_id: i64,
    name: String,
    from_account: String,
}

impl From<SequenceRow> for Sequence {
    fn from(row: SequenceRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            from_account: row.from_account,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SequenceStepRow {
    id: i64,
    sequence_id: i64,
    subject: String,
    body: String,
    delay_amount: i64,
    delay_unit: String,
    position: i32,
}

impl TryFrom<SequenceStepRow> for SequenceStep {
    type Error = StoreError;

    fn try_from(row: SequenceStepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            sequence_id: row.sequence_id,
            subject: row.subject,
            body: row.body,
            delay_amount: row.delay_amount,
            delay_unit: row.delay_unit.parse()?,
            position: row.position,
        })
    }
}

#[async_trait]
impl OutreachStore for PgStore {
    async fn campaign(&self, id: i64) -> Result<Option<Campaign>, StoreError> {
        let row = sqlx::query_as::<_, CampaignRow>(
            "SELECT id, user_id, from_account, subject, body, scheduled_at, status \
             FROM campaigns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Campaign::try_from).transpose()
    }

    async fn update_campaign_status(
        &self,
        id: i64,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE campaigns SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn sequence(&self, id: i64) -> Result<Option<Sequence>, StoreError> {
        let row = sqlx::query_as::<_, SequenceRow>(
            "SELECT id, user_id, name, from_account FROM sequences WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Sequence::from))
    }

    async fn sequence_step(
        &self,
        sequence_id: i64,
        position: i32,
    ) -> Result<Option<SequenceStep>, StoreError> {
        let row = sqlx::query_as::<_, SequenceStepRow>(
            "SELECT id, sequence_id, subject, body, delay_amount, delay_unit, position \
             FROM sequence_steps WHERE sequence_id = $1 AND position = $2",
        )
        .bind(sequence_id)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SequenceStep::try_from).transpose()
    }

    async fn insert_tracking(&self, record: NewTrackingRecord) -> Result<i64, StoreError> {
        let now = Utc::now();
        let bounced_at = match record.status {
            TrackingStatus::Bounced => Some(now),
            TrackingStatus::Sent => None,
        };

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO tracking_records \
             (campaign_id, sequence_id, step, recipient, status, sent_at, bounced_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(record.campaign_id)
        .bind(record.sequence_id)
        .bind(record.step)
        .bind(&record.recipient)
        .bind(record.status.as_str())
        .bind(now)
        .bind(bounced_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }
}
