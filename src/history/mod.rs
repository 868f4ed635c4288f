//! Uptime history engine.
//!
//! Turns a store of per-target availability samples into a consistent
//! multi-resolution history: gap-filled fine-grained samples, hourly
//! summaries and daily summaries, each with bounded retention.

mod clock;
mod combine;
mod gaps;
mod normalize;
mod report;
mod retention;
mod summary;

pub use clock::*;
pub use combine::*;
pub use gaps::*;
pub use normalize::*;
pub use report::*;
pub use retention::*;
pub use summary::*;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;

/// Precondition violations found in a history record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("malformed timestamp {0:?}, expected YYYY-MM-DDTHH:MMZ")]
    MalformedTimestamp(String),
    #[error("malformed date {0:?}, expected YYYY-MM-DD")]
    MalformedDate(String),
    #[error("key {0:?} names a bucket that already appears in the same map")]
    DuplicateKey(String),
    #[error("{target}: sample at {timestamp} is not on a 5-minute boundary")]
    MisalignedSample { target: String, timestamp: Timestamp },
    #[error("{target}: hourly summary key {timestamp} is not on an hour boundary")]
    MisalignedHour { target: String, timestamp: Timestamp },
    #[error("{target}: uptime {uptime} for {bucket} is outside [0, 1]")]
    UptimeOutOfRange {
        target: String,
        bucket: String,
        uptime: f64,
    },
    #[error("{target}: sample at {timestamp} is later than the reference instant {now}")]
    FutureSample {
        target: String,
        timestamp: Timestamp,
        now: Timestamp,
    },
}

/// An instant truncated to whole minutes, in UTC.
///
/// Renders as `YYYY-MM-DDTHH:MMZ`. Ordering is chronological, which for the
/// canonical form is the same as lexicographic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Build a timestamp, dropping seconds and sub-second precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_window(dt, 60))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_five_minute_aligned(&self) -> bool {
        self.0.timestamp().rem_euclid(FIVE_MINUTES_SECS) == 0
    }

    pub fn is_hour_aligned(&self) -> bool {
        self.0.timestamp().rem_euclid(HOUR_SECS) == 0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minute_precision(self.0))
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timestamp(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Availability of a target at one sample slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Available,
    Unavailable,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Available => f.write_str("available"),
            Status::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Uptime for one elapsed hour or day, as a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub uptime: f64,
}

impl Summary {
    pub fn new(uptime: f64) -> Self {
        Self { uptime }
    }
}

pub type FineGrainedSeries = BTreeMap<Timestamp, Status>;
pub type HourlySummary = BTreeMap<Timestamp, Summary>;
pub type DailySummary = BTreeMap<NaiveDate, Summary>;

/// All monitored targets, keyed by name.
pub type HistoryStore = BTreeMap<String, NamespaceRecord>;

/// History of a single monitored target.
///
/// Records are values: every transformation builds a new record rather than
/// editing one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceRecord {
    #[serde(default, deserialize_with = "deserialize_keyed")]
    fine_grained_data: FineGrainedSeries,
    #[serde(default, deserialize_with = "deserialize_keyed")]
    summarised_by_hour: HourlySummary,
    #[serde(default, deserialize_with = "deserialize_keyed")]
    summarised_by_date: DailySummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    earliest_fine_grained_data: Option<Timestamp>,
}

impl NamespaceRecord {
    pub fn new(
        fine_grained_data: FineGrainedSeries,
        summarised_by_hour: HourlySummary,
        summarised_by_date: DailySummary,
    ) -> Self {
        let earliest_fine_grained_data = fine_grained_data.keys().next().copied();
        Self {
            fine_grained_data,
            summarised_by_hour,
            summarised_by_date,
            earliest_fine_grained_data,
        }
    }

    /// A fresh record holding a single sample.
    pub fn from_sample(timestamp: Timestamp, status: Status) -> Self {
        Self::new(
            FineGrainedSeries::from([(timestamp, status)]),
            HourlySummary::new(),
            DailySummary::new(),
        )
    }

    /// A copy of this record with `status` written at `timestamp`.
    pub fn with_sample(&self, timestamp: Timestamp, status: Status) -> Self {
        let mut fine_grained_data = self.fine_grained_data.clone();
        fine_grained_data.insert(timestamp, status);
        Self::new(
            fine_grained_data,
            self.summarised_by_hour.clone(),
            self.summarised_by_date.clone(),
        )
    }

    pub fn fine_grained_data(&self) -> &FineGrainedSeries {
        &self.fine_grained_data
    }

    pub fn summarised_by_hour(&self) -> &HourlySummary {
        &self.summarised_by_hour
    }

    pub fn summarised_by_date(&self) -> &DailySummary {
        &self.summarised_by_date
    }

    pub fn earliest_fine_grained_data(&self) -> Option<Timestamp> {
        self.earliest_fine_grained_data
    }

    /// Check the record's preconditions against the reference instant `now`.
    pub fn validate(&self, target: &str, now: Timestamp) -> Result<(), ValidationError> {
        for &timestamp in self.fine_grained_data.keys() {
            if !timestamp.is_five_minute_aligned() {
                return Err(ValidationError::MisalignedSample {
                    target: target.to_string(),
                    timestamp,
                });
            }
            if timestamp > now {
                return Err(ValidationError::FutureSample {
                    target: target.to_string(),
                    timestamp,
                    now,
                });
            }
        }

        for (&timestamp, summary) in &self.summarised_by_hour {
            if !timestamp.is_hour_aligned() {
                return Err(ValidationError::MisalignedHour {
                    target: target.to_string(),
                    timestamp,
                });
            }
            check_uptime(target, &timestamp, summary)?;
        }

        for (date, summary) in &self.summarised_by_date {
            check_uptime(target, date, summary)?;
        }

        Ok(())
    }
}

fn check_uptime(
    target: &str,
    bucket: &dyn fmt::Display,
    summary: &Summary,
) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&summary.uptime) {
        Ok(())
    } else {
        Err(ValidationError::UptimeOutOfRange {
            target: target.to_string(),
            bucket: bucket.to_string(),
            uptime: summary.uptime,
        })
    }
}

/// Keys of the persisted maps, parsed from their string form.
trait HistoryKey: Ord + Sized {
    fn parse_key(raw: &str) -> Result<Self, ValidationError>;
}

impl HistoryKey for Timestamp {
    fn parse_key(raw: &str) -> Result<Self, ValidationError> {
        parse_timestamp(raw)
    }
}

impl HistoryKey for NaiveDate {
    fn parse_key(raw: &str) -> Result<Self, ValidationError> {
        parse_date(raw)
    }
}

/// Deserialize a map whose keys must name distinct buckets.
///
/// Legacy and canonical spellings parse to the same key, so a map holding
/// both is rejected instead of letting one silently replace the other.
fn deserialize_keyed<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: HistoryKey,
    V: Deserialize<'de>,
{
    struct KeyedMap<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for KeyedMap<K, V>
    where
        K: HistoryKey,
        V: Deserialize<'de>,
    {
        type Value = BTreeMap<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map keyed by timestamp or date")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((raw, value)) = access.next_entry::<String, V>()? {
                let key = K::parse_key(&raw).map_err(de::Error::custom)?;
                if map.insert(key, value).is_some() {
                    return Err(de::Error::custom(ValidationError::DuplicateKey(raw)));
                }
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(KeyedMap(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_timestamp_truncates_to_minute() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56).unwrap();
        assert_eq!(Timestamp::from_datetime(dt).to_string(), "2024-01-01T12:34Z");
    }

    #[test]
    fn test_record_serializes_in_persisted_layout() {
        let record = NamespaceRecord::new(
            FineGrainedSeries::from([(ts("2024-01-01T00:05Z"), Status::Available)]),
            HourlySummary::from([(ts("2023-12-31T23:00Z"), Summary::new(0.5))]),
            DailySummary::new(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fineGrainedData"]["2024-01-01T00:05Z"], "available");
        assert_eq!(json["summarisedByHour"]["2023-12-31T23:00Z"]["uptime"], 0.5);
        assert_eq!(json["earliestFineGrainedData"], "2024-01-01T00:05Z");
        assert!(json["summarisedByDate"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_record_deserializes_legacy_keys() {
        let json = r#"{
            "fineGrainedData": { "2024-01-01T00:05": "unavailable" },
            "summarisedByHour": { "2023-12-31T23": { "uptime": 1 } },
            "summarisedByDate": { "2023-12-30": { "uptime": 0.25 } }
        }"#;
        let record: NamespaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.fine_grained_data().get(&ts("2024-01-01T00:05Z")),
            Some(&Status::Unavailable)
        );
        assert!(record.summarised_by_hour().contains_key(&ts("2023-12-31T23:00Z")));
        assert_eq!(record.summarised_by_date().len(), 1);
    }

    #[test]
    fn test_record_rejects_garbage_keys() {
        let json = r#"{ "fineGrainedData": { "yesterday": "available" } }"#;
        assert!(serde_json::from_str::<NamespaceRecord>(json).is_err());

        let unpadded = r#"{ "fineGrainedData": { "2024-1-1T0:05Z": "available" } }"#;
        assert!(serde_json::from_str::<NamespaceRecord>(unpadded).is_err());

        let unpadded_date = r#"{ "summarisedByDate": { "2024-1-5": { "uptime": 1 } } }"#;
        assert!(serde_json::from_str::<NamespaceRecord>(unpadded_date).is_err());
    }

    #[test]
    fn test_record_rejects_two_spellings_of_one_slot() {
        let json = r#"{
            "fineGrainedData": {
                "2024-01-01T00:05Z": "available",
                "2024-01-01T00:05": "unavailable"
            }
        }"#;
        let err = serde_json::from_str::<NamespaceRecord>(json).unwrap_err();
        assert!(err.to_string().contains("2024-01-01T00:05"));

        let hours = r#"{
            "summarisedByHour": {
                "2023-12-31T23": { "uptime": 1 },
                "2023-12-31T23:00Z": { "uptime": 0.5 }
            }
        }"#;
        assert!(serde_json::from_str::<NamespaceRecord>(hours).is_err());
    }

    #[test]
    fn test_with_sample_leaves_original_untouched() {
        let original = NamespaceRecord::from_sample(ts("2024-01-01T00:00Z"), Status::Available);
        let updated = original.with_sample(ts("2024-01-01T00:05Z"), Status::Unavailable);
        assert_eq!(original.fine_grained_data().len(), 1);
        assert_eq!(updated.fine_grained_data().len(), 2);
        assert_eq!(updated.earliest_fine_grained_data(), Some(ts("2024-01-01T00:00Z")));
    }

    #[test]
    fn test_validate() {
        let now = ts("2024-01-01T01:00Z");

        let misaligned = NamespaceRecord::from_sample(ts("2024-01-01T00:03Z"), Status::Available);
        assert!(matches!(
            misaligned.validate("a", now),
            Err(ValidationError::MisalignedSample { .. })
        ));

        let future = NamespaceRecord::from_sample(ts("2024-01-01T01:05Z"), Status::Available);
        assert!(matches!(
            future.validate("a", now),
            Err(ValidationError::FutureSample { .. })
        ));

        let bad_hour = NamespaceRecord::new(
            FineGrainedSeries::new(),
            HourlySummary::from([(ts("2024-01-01T00:30Z"), Summary::new(1.0))]),
            DailySummary::new(),
        );
        assert!(matches!(
            bad_hour.validate("a", now),
            Err(ValidationError::MisalignedHour { .. })
        ));

        let bad_uptime = NamespaceRecord::new(
            FineGrainedSeries::new(),
            HourlySummary::from([(ts("2024-01-01T00:00Z"), Summary::new(1.5))]),
            DailySummary::new(),
        );
        assert!(matches!(
            bad_uptime.validate("a", now),
            Err(ValidationError::UptimeOutOfRange { .. })
        ));

        let good = NamespaceRecord::from_sample(ts("2024-01-01T01:00Z"), Status::Available);
        assert!(good.validate("a", now).is_ok());
    }
}
