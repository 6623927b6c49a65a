//! Campaign batch delivery job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use super::send_one;
use crate::jobs::{Job, JobContext, JobError, JobResult};
use crate::store::{CampaignStatus, NewTrackingRecord};

/// Send one campaign email to every recipient in the payload.
///
/// Each recipient is attempted in payload order; a failed send is recorded
/// as a `bounced` tracking row and the batch continues. After the batch the
/// campaign is marked `completed`. A store failure propagates and the queue
/// retries the whole job; previously successful recipients are then
/// re-sent, since tracking rows carry no idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendCampaignJob {
    /// Campaign whose status is updated on completion.
    pub campaign_id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Sender account identifier (also the From header).
    #[validate(length(min = 1))]
    pub from_account: String,
    /// Email subject.
    #[validate(length(min = 1))]
    pub subject: String,
    /// Email body (HTML).
    pub body: String,
    /// Recipient addresses, processed in order.
    #[validate(length(min = 1), custom(function = recipients_are_addresses))]
    pub recipients: Vec<String>,
}

fn recipients_are_addresses(recipients: &[String]) -> Result<(), ValidationError> {
    if recipients.iter().all(|r| r.contains('@')) {
        Ok(())
    } else {
        Err(ValidationError::new("recipient_not_an_address"))
    }
}

/// What a campaign job accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignOutcome {
    /// Recipients the transport accepted.
    pub sent: usize,
    /// Recipients recorded as bounced.
    pub bounced: usize,
}

#[async_trait]
impl Job for SendCampaignJob {
    type Result = CampaignOutcome;

    async fn execute(&self, ctx: &JobContext) -> JobResult<Self::Result> {
        self.validate()
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;

        let store = ctx
            .store()
            .ok_or(JobError::ServiceUnavailable("outreach store"))?;

        let mut outcome = CampaignOutcome { sent: 0, bounced: 0 };

        for recipient in &self.recipients {
            match send_one(ctx, &self.from_account, recipient, &self.subject, &self.body).await {
                Ok(()) => {
                    store
                        .insert_tracking(NewTrackingRecord::campaign_sent(
                            self.campaign_id,
                            recipient,
                        ))
                        .await?;
                    outcome.sent += 1;
                }
                Err(err) => {
                    warn!(
                        campaign = self.campaign_id,
                        recipient = %recipient,
                        error = %err,
                        "campaign send bounced"
                    );
                    store
                        .insert_tracking(NewTrackingRecord::campaign_bounced(
                            self.campaign_id,
                            recipient,
                        ))
                        .await?;
                    outcome.bounced += 1;
                }
            }
        }

        store
            .update_campaign_status(self.campaign_id, CampaignStatus::Completed)
            .await?;

        info!(
            campaign = self.campaign_id,
            sent = outcome.sent,
            bounced = outcome.bounced,
            "campaign completed"
        );

        Ok(outcome)
    }

    fn job_type(&self) -> &'static str {
        "send_campaign"
    }
}
