//! Step delay conversion.

use std::time::Duration;

use crate::store::DelayUnit;

/// Convert a step's interval into a scheduling delay.
///
/// An hour is exactly 3,600,000 ms and a day exactly 86,400,000 ms; there is
/// no timezone or calendar awareness.
#[must_use]
pub fn step_delay(amount: u64, unit: DelayUnit) -> Duration {
    Duration::from_secs(amount.saturating_mul(unit.seconds()))
}
