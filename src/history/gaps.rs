//! Gap filling: marks missing sample slots as unavailable.

use super::{
    align_up_to_next_five_minutes, ms_between, FineGrainedSeries, Status, Timestamp,
    FIVE_MINUTES_MS,
};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// How long a missing sample may be late before it counts as an outage.
pub const GRACE_PERIOD_MINUTES: i64 = 10;

/// The newest slot whose absence is treated as a confirmed outage.
///
/// At 12:15 the newest slot required is 12:10; at 12:20 it becomes 12:15.
/// Anything newer is still inside the grace period.
pub fn latest_expected(now: DateTime<Utc>) -> Timestamp {
    align_up_to_next_five_minutes(now - ChronoDuration::minutes(GRACE_PERIOD_MINUTES))
}

/// Return a copy of `series` with `unavailable` markers in every missing slot.
///
/// Afterwards no two consecutive samples are more than five minutes apart,
/// and the newest sample is no older than [`latest_expected`]. An empty
/// series is returned unchanged.
pub fn fill_gaps(series: &FineGrainedSeries, now: DateTime<Utc>) -> FineGrainedSeries {
    let mut filled = series.clone();

    let Some(&newest) = filled.keys().next_back() else {
        return filled;
    };

    let expected = latest_expected(now);
    if newest < expected {
        filled.insert(expected, Status::Unavailable);
    }

    let timestamps: Vec<Timestamp> = filled.keys().copied().collect();
    let mut markers = Vec::new();
    for pair in timestamps.windows(2) {
        let (mut cursor, next) = (pair[0], pair[1]);
        while ms_between(cursor, next) > FIVE_MINUTES_MS {
            cursor = align_up_to_next_five_minutes(cursor.as_datetime());
            markers.push(cursor);
        }
    }

    for marker in markers {
        filled.entry(marker).or_insert(Status::Unavailable);
    }

    filled
}
