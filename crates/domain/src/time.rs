//! Time and timestamp helpers.

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;

/// UTC timestamp used for schedules, attempts, and audit fields.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Longest send delay an automation may configure, hours included.
pub const MAX_DELAY_DAYS: u32 = 3650;

/// Convert a `days` + `hours` delay into a [`Duration`].
#[must_use]
pub fn delay(days: u32, hours: u32) -> Duration {
    Duration::days(i64::from(days)) + Duration::hours(i64::from(hours))
}

/// Reject delays longer than [`MAX_DELAY_DAYS`].
///
/// # Errors
///
/// Returns [`ValidationError::DelayTooLong`] when `days` and `hours` together
/// exceed the limit.
pub fn check_delay(days: u32, hours: u32) -> Result<(), ValidationError> {
    let total_hours = u64::from(days) * 24 + u64::from(hours);
    if total_hours > u64::from(MAX_DELAY_DAYS) * 24 {
        return Err(ValidationError::DelayTooLong {
            days,
            hours,
            max_days: MAX_DELAY_DAYS,
        });
    }
    Ok(())
}

/// `now` plus the delay, or an error when the delay is out of range.
///
/// # Errors
///
/// Returns [`ValidationError::DelayTooLong`] when the delay exceeds
/// [`MAX_DELAY_DAYS`] or the result does not fit a [`Timestamp`].
pub fn after_delay(now: Timestamp, days: u32, hours: u32) -> Result<Timestamp, ValidationError> {
    check_delay(days, hours)?;
    now.checked_add_signed(delay(days, hours))
        .ok_or(ValidationError::DelayTooLong {
            days,
            hours,
            max_days: MAX_DELAY_DAYS,
        })
}
