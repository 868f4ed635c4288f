//! Normalization: one pass of gap filling, summarising and pruning per target.

use super::{
    fill_gaps, measurement_lengths, prune, summarise_by_date, summarise_by_hour, HistoryStore,
    NamespaceRecord, RetentionPolicies, Timestamp, ValidationError,
};

use chrono::{DateTime, Utc};

/// Normalize every target with the default retention policies.
///
/// Pure: `store` is left untouched and a new store is returned. Running it
/// again on its own output with the same `now` yields the same store.
pub fn normalize(store: &HistoryStore, now: DateTime<Utc>) -> Result<HistoryStore, ValidationError> {
    normalize_with(store, now, &RetentionPolicies::default())
}

pub fn normalize_with(
    store: &HistoryStore,
    now: DateTime<Utc>,
    policies: &RetentionPolicies,
) -> Result<HistoryStore, ValidationError> {
    let now = Timestamp::from_datetime(now).as_datetime();

    store
        .iter()
        .map(|(name, record)| {
            let normalized = normalize_namespace(name, record, now, policies)?;
            Ok((name.clone(), normalized))
        })
        .collect()
}

/// Normalize one target's record against `now`.
pub fn normalize_namespace(
    target: &str,
    record: &NamespaceRecord,
    now: DateTime<Utc>,
    policies: &RetentionPolicies,
) -> Result<NamespaceRecord, ValidationError> {
    record.validate(target, Timestamp::from_datetime(now))?;

    let filled = fill_gaps(record.fine_grained_data(), now);
    let markers = filled.len() - record.fine_grained_data().len();
    if markers > 0 {
        tracing::debug!("Normalizer: {} marked {} missing samples unavailable", target, markers);
    }

    let lengths = measurement_lengths(&filled);
    let hourly = summarise_by_hour(target, &filled, &lengths, record.summarised_by_hour(), now);
    let daily = summarise_by_date(target, &filled, &lengths, record.summarised_by_date(), now);

    Ok(prune(&NamespaceRecord::new(filled, hourly, daily), now, policies))
}
