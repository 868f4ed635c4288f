//! Hourly and daily uptime summaries.
//!
//! Uptime is interval-weighted: each sample counts for the time until the next
//! sample, and the newest sample counts for nothing. A bucket is summarised
//! once, after it has fully elapsed, and never recomputed.

use super::{
    date_of, hour_start, ms_between, DailySummary, FineGrainedSeries, HourlySummary, Status,
    Summary, Timestamp, DAY_MS, HOUR_MS,
};

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Milliseconds from each sample to its successor. The newest sample has no entry.
pub type MeasurementLengths = BTreeMap<Timestamp, i64>;

pub fn measurement_lengths(series: &FineGrainedSeries) -> MeasurementLengths {
    series
        .keys()
        .zip(series.keys().skip(1))
        .map(|(&this, &next)| (this, ms_between(this, next)))
        .collect()
}

/// Milliseconds of available time attributed to samples that fall in a bucket.
pub fn available_ms<F>(series: &FineGrainedSeries, lengths: &MeasurementLengths, in_bucket: F) -> i64
where
    F: Fn(Timestamp) -> bool,
{
    series
        .iter()
        .filter(|&(&ts, &status)| status == Status::Available && in_bucket(ts))
        .filter_map(|(ts, _)| lengths.get(ts))
        .sum()
}

pub fn summarise_by_hour(
    target: &str,
    series: &FineGrainedSeries,
    lengths: &MeasurementLengths,
    existing: &HourlySummary,
    now: DateTime<Utc>,
) -> HourlySummary {
    let this_hour = hour_start(Timestamp::from_datetime(now));
    summarise(target, series, lengths, existing, this_hour, hour_start, HOUR_MS)
}

pub fn summarise_by_date(
    target: &str,
    series: &FineGrainedSeries,
    lengths: &MeasurementLengths,
    existing: &DailySummary,
    now: DateTime<Utc>,
) -> DailySummary {
    let today = now.date_naive();
    summarise(target, series, lengths, existing, today, date_of, DAY_MS)
}

/// Extend `existing` with a summary for every elapsed bucket that has
/// samples but no summary yet. `current` is the open bucket, always skipped.
fn summarise<K, F>(
    target: &str,
    series: &FineGrainedSeries,
    lengths: &MeasurementLengths,
    existing: &BTreeMap<K, Summary>,
    current: K,
    bucket_of: F,
    bucket_ms: i64,
) -> BTreeMap<K, Summary>
where
    K: Ord + Copy + Display,
    F: Fn(Timestamp) -> K,
{
    let buckets: BTreeSet<K> = series.keys().map(|&ts| bucket_of(ts)).collect();
    let mut summaries = existing.clone();

    for bucket in buckets {
        if bucket == current || summaries.contains_key(&bucket) {
            continue;
        }

        let uptime_ms = available_ms(series, lengths, |ts| bucket_of(ts) == bucket);
        let uptime = uptime_ms as f64 / bucket_ms as f64;
        tracing::debug!("Summariser: {} uptime for {}: {:.4}", target, bucket, uptime);
        summaries.insert(bucket, Summary::new(uptime));
    }

    summaries
}
