//! Merges a cycle's probe samples into the history store.

use super::{floor_to_five_minutes, HistoryStore, NamespaceRecord, Status};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One probe's verdict for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub status: Status,
}

impl Sample {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Write each sample into its target's series at the 5-minute slot of `now`.
///
/// Targets seen for the first time get a new record. When a name appears more
/// than once, the last sample wins.
pub fn record_samples(store: &HistoryStore, samples: &[Sample], now: DateTime<Utc>) -> HistoryStore {
    let slot = floor_to_five_minutes(now);
    let mut combined = store.clone();

    for sample in samples {
        let record = match combined.get(&sample.name) {
            Some(existing) => existing.with_sample(slot, sample.status),
            None => NamespaceRecord::from_sample(slot, sample.status),
        };
        combined.insert(sample.name.clone(), record);
    }

    combined
}
