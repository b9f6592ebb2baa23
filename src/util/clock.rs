//! Clock helpers.
//!
//! Due times and enqueue deadlines are absolute [`Instant`]s on the monotonic
//! clock, so wall-clock adjustments never reorder or stall scheduled work.

use std::time::{Duration, Instant};

/// Absolute deadline `timeout` from now, saturating far in the future on overflow.
#[must_use]
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)))
}
