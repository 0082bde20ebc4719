//! Countdown arithmetic.
//!
//! Remaining time is always derived from the phase's end timestamp and the
//! current time, never decremented per tick, so tick jitter, pauses and
//! manual adjustments cannot make the display drift.

use chrono::Duration;
use std::fmt;

use crate::clock::Timestamp;

/// Whole seconds left until `ends_at`, rounded rather than truncated.
/// Negative once the deadline has passed.
pub fn remaining_seconds(now: Timestamp, ends_at: Timestamp) -> i64 {
    let millis = (ends_at - now).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

pub fn is_expired(remaining_seconds: i64) -> bool {
    remaining_seconds <= 0
}

/// Converts a (possibly fractional) minute count into a duration, or `None`
/// when it does not fit.
pub fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    Duration::try_milliseconds((minutes * 60_000.0).round() as i64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Remaining {
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// Splits a remaining-seconds value for display. Expired (negative)
    /// values show as `0:00`.
    pub fn from_seconds(remaining_seconds: i64) -> Self {
        let total = remaining_seconds.max(0);
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> i64 {
        self.minutes * 60 + self.seconds
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.total_seconds())
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}
