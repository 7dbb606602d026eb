//! Countdown arithmetic. Pure functions of a stored trip and an instant, so
//! every observer (admin list, student screen, overdue sweep) agrees and no
//! tick ever writes to the store.

use chrono::{DateTime, Utc};

use safemove_types::api::TimerReading;
use safemove_types::models::Trip;

/// Readings at or below this many seconds are flagged for attention.
pub const WARNING_THRESHOLD_SECS: i64 = 600;

/// `max(0, duration - floor(elapsed))`. An instant before the trip started
/// counts as zero elapsed time.
pub fn remaining_seconds(trip: &Trip, now: DateTime<Utc>) -> i64 {
    trip.remaining_secs_at(now)
}

pub fn reading(trip: &Trip, now: DateTime<Utc>) -> TimerReading {
    let remaining = remaining_seconds(trip, now);
    TimerReading {
        student_id: trip.student_id,
        trip_id: trip.id,
        status: trip.status,
        duration_secs: trip.duration_secs,
        started_at: trip.started_at,
        remaining_seconds: remaining,
        expired: remaining == 0,
        warning: remaining <= WARNING_THRESHOLD_SECS,
        display: format_clock(remaining),
    }
}

/// `MM:SS`; minutes keep counting past 59.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
