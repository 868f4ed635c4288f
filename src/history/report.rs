//! Read-side digest of a target's history.

use super::{NamespaceRecord, Status, Summary, Timestamp};

use serde::Serialize;

/// Current status and rolling uptime of one target, as shown on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub current_status: Option<Status>,
    pub last_sample: Option<Timestamp>,
    /// Percentages in `[0, 100]`, `None` when the tier holds no data.
    pub fine_grained_uptime: Option<f64>,
    pub hourly_uptime: Option<f64>,
    pub daily_uptime: Option<f64>,
}

pub fn report(name: &str, record: &NamespaceRecord) -> TargetReport {
    let latest = record.fine_grained_data().iter().next_back();

    let fine_grained = record.fine_grained_data().values().map(|status| match status {
        Status::Available => 1.0,
        Status::Unavailable => 0.0,
    });

    TargetReport {
        name: name.to_string(),
        current_status: latest.map(|(_, status)| *status),
        last_sample: latest.map(|(ts, _)| *ts),
        fine_grained_uptime: proportions_to_percent(fine_grained),
        hourly_uptime: proportions_to_percent(record.summarised_by_hour().values().map(uptime_of)),
        daily_uptime: proportions_to_percent(record.summarised_by_date().values().map(uptime_of)),
    }
}

fn uptime_of(summary: &Summary) -> f64 {
    summary.uptime
}

/// Mean of the proportions as a percentage rounded to two decimals.
///
/// Only a perfect record reports 100; anything short of it is capped at 99.99.
pub fn proportions_to_percent<I>(proportions: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (mut sum, mut count, mut perfect) = (0.0, 0usize, true);
    for proportion in proportions {
        sum += proportion;
        count += 1;
        perfect &= proportion >= 1.0;
    }

    if count == 0 {
        return None;
    }
    if perfect {
        return Some(100.0);
    }

    let percent = (sum / count as f64 * 10_000.0).round() / 100.0;
    Some(percent.min(99.99))
}
