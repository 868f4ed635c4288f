//! Retention: drops history older than each tier's window.

use super::{NamespaceRecord, Timestamp};

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};

/// How long each resolution is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicies {
    pub fine_grained: ChronoDuration,
    pub hourly: ChronoDuration,
    pub daily: ChronoDuration,
}

impl Default for RetentionPolicies {
    fn default() -> Self {
        Self {
            fine_grained: ChronoDuration::hours(25),
            // Same window as the fine-grained tier, so the hourly view only
            // ever covers the last day.
            hourly: ChronoDuration::hours(25),
            daily: ChronoDuration::days(25),
        }
    }
}

impl RetentionPolicies {
    /// Validate the policies: every window must be positive.
    pub fn validate(&self) -> Result<(), String> {
        for (tier, window) in [
            ("fine-grained", self.fine_grained),
            ("hourly", self.hourly),
            ("daily", self.daily),
        ] {
            if window <= ChronoDuration::zero() {
                return Err(format!("{} retention must be positive", tier));
            }
        }
        Ok(())
    }
}

/// Return a copy of `record` without entries older than their tier's cutoff.
///
/// An entry exactly at the cutoff is kept. Summaries are compared by the
/// start of their bucket.
pub fn prune(record: &NamespaceRecord, now: DateTime<Utc>, policies: &RetentionPolicies) -> NamespaceRecord {
    let fine_cutoff = now - policies.fine_grained;
    let hourly_cutoff = now - policies.hourly;
    let daily_cutoff = now - policies.daily;

    let fine_grained = record
        .fine_grained_data()
        .iter()
        .filter(|(ts, _)| is_retained(**ts, fine_cutoff))
        .map(|(ts, status)| (*ts, *status))
        .collect();

    let hourly = record
        .summarised_by_hour()
        .iter()
        .filter(|(hour, _)| is_retained(**hour, hourly_cutoff))
        .map(|(hour, summary)| (*hour, *summary))
        .collect();

    let daily = record
        .summarised_by_date()
        .iter()
        .filter(|(date, _)| date.and_time(NaiveTime::MIN).and_utc() >= daily_cutoff)
        .map(|(date, summary)| (*date, *summary))
        .collect();

    NamespaceRecord::new(fine_grained, hourly, daily)
}

fn is_retained(ts: Timestamp, cutoff: DateTime<Utc>) -> bool {
    ts.as_datetime() >= cutoff
}
