//! Outreach delivery: campaign batches and drip sequences.
//!
//! The two job handlers here are the heart of the subsystem. A campaign job
//! fans one subject/body out to a recipient list; a sequence-step job sends
//! one step to one recipient and schedules the next step after its
//! configured delay. Both isolate per-send failures as `bounced` tracking
//! rows; only data-access failures propagate into the queue retry path.

mod campaign;
mod delay;
mod runtime;
mod sequence;

pub use campaign::{CampaignOutcome, SendCampaignJob};
pub use delay::step_delay;
pub use runtime::OutreachRuntime;
pub use sequence::{SequenceAdvance, SequenceStepJob, StepScheduler};

use chrono::Utc;

use crate::email::{Email, EmailError};
use crate::jobs::JobContext;

/// Uniqueness reference for one delivery: millisecond timestamp plus a
/// random suffix, carried as the outgoing message id.
pub(crate) fn delivery_reference() -> String {
    format!("{}.{:08x}", Utc::now().timestamp_millis(), rand::random::<u32>())
}

/// Resolve the account's transport and send one outreach email.
///
/// Resolution happens per send, with no transport cache, so a provider
/// swap or token revocation takes effect on the next attempt.
pub(crate) async fn send_one(
    ctx: &JobContext,
    from_account: &str,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<(), EmailError> {
    let transports = ctx
        .transports()
        .ok_or_else(|| EmailError::config("transport resolver not configured"))?;

    let transport = transports.resolve(from_account)?;

    let email = Email::new()
        .to(recipient)
        .from(from_account)
        .subject(subject)
        .html(body)
        .reference(delivery_reference());

    transport.send(email).await
}
