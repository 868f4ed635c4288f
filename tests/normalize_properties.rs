//! End-to-end behaviour of the normalization engine.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use uptrail::history::{
    ms_between, normalize, record_samples, FineGrainedSeries, HistoryStore, NamespaceRecord,
    Sample, Status, Summary, Timestamp, FIVE_MINUTES_MS,
};

fn ts(s: &str) -> Timestamp {
    s.parse().unwrap()
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
}

fn single(name: &str, series: FineGrainedSeries) -> HistoryStore {
    HistoryStore::from([(
        name.to_string(),
        NamespaceRecord::new(series, Default::default(), Default::default()),
    )])
}

/// A few irregular histories: sparse samples, an outage, a long silence.
fn fixtures() -> Vec<HistoryStore> {
    vec![
        single("a", FineGrainedSeries::from([(ts("2024-01-01T00:00Z"), Status::Available)])),
        single(
            "b",
            FineGrainedSeries::from([
                (ts("2024-01-01T22:00Z"), Status::Available),
                (ts("2024-01-01T22:05Z"), Status::Unavailable),
                (ts("2024-01-01T23:40Z"), Status::Available),
                (ts("2024-01-02T00:10Z"), Status::Available),
            ]),
        ),
        single(
            "c",
            (0..40)
                .map(|i| {
                    let slot = Timestamp::from_datetime(at(1, 10, 0) + ChronoDuration::minutes(5 * i));
                    let status = if i % 7 == 0 { Status::Unavailable } else { Status::Available };
                    (slot, status)
                })
                .collect(),
        ),
    ]
}

fn reference_instants() -> Vec<DateTime<Utc>> {
    vec![at(2, 0, 20), at(2, 1, 0), at(2, 3, 17), at(2, 23, 59), at(4, 12, 0)]
}

#[test]
fn normalizing_twice_changes_nothing() {
    for store in fixtures() {
        for now in reference_instants() {
            let once = normalize(&store, now).unwrap();
            let twice = normalize(&once, now).unwrap();
            assert_eq!(once, twice, "not idempotent at {}", now);
        }
    }
}

#[test]
fn no_gap_wider_than_five_minutes() {
    for store in fixtures() {
        for now in reference_instants() {
            for record in normalize(&store, now).unwrap().values() {
                let keys: Vec<Timestamp> = record.fine_grained_data().keys().copied().collect();
                for pair in keys.windows(2) {
                    assert!(
                        ms_between(pair[0], pair[1]) <= FIVE_MINUTES_MS,
                        "gap between {} and {} at {}",
                        pair[0],
                        pair[1],
                        now
                    );
                }
            }
        }
    }
}

#[test]
fn staleness_grace_period() {
    let store = single("a", FineGrainedSeries::from([(ts("2024-01-01T12:00Z"), Status::Available)]));

    // Less than ten minutes old: nothing added
    let fresh = normalize(&store, at(1, 12, 9)).unwrap();
    assert_eq!(fresh["a"].fine_grained_data().len(), 1);

    // Ten minutes old: exactly one marker on the next boundary
    let stale = normalize(&store, at(1, 12, 10)).unwrap();
    let series = stale["a"].fine_grained_data();
    assert_eq!(series.len(), 2);
    assert_eq!(series.get(&ts("2024-01-01T12:05Z")), Some(&Status::Unavailable));
}

#[test]
fn hourly_uptime_matches_manual_weighting() {
    let store = single(
        "a",
        FineGrainedSeries::from([
            (ts("2024-01-01T05:00Z"), Status::Available),
            (ts("2024-01-01T05:05Z"), Status::Available),
            (ts("2024-01-01T05:10Z"), Status::Unavailable),
        ]),
    );
    // Within the grace window of 05:10, so no markers disturb the hour
    let out = normalize(&store, at(1, 5, 15)).unwrap();
    assert!(out["a"].summarised_by_hour().is_empty());

    // Once the hour has elapsed the gap after 05:10 is filled with outages,
    // leaving two available five-minute intervals.
    let out = normalize(&store, at(1, 6, 30)).unwrap();
    let uptime = out["a"].summarised_by_hour()[&ts("2024-01-01T05:00Z")].uptime;
    assert_eq!(uptime, (2.0 * 300_000.0) / 3_600_000.0);
}

#[test]
fn retention_cutoff_is_inclusive() {
    let store = single(
        "a",
        FineGrainedSeries::from([
            (ts("2024-01-01T00:00Z"), Status::Available),
            (ts("2024-01-01T00:05Z"), Status::Available),
        ]),
    );
    // 25 hours after 00:05: 00:05 sits on the cutoff, 00:00 is older
    let out = normalize(&store, at(2, 1, 5)).unwrap();
    let first = out["a"].fine_grained_data().keys().next().copied();
    assert_eq!(first, Some(ts("2024-01-01T00:05Z")));
    assert_eq!(out["a"].earliest_fine_grained_data(), first);
}

#[test]
fn hourly_summaries_kept_for_twenty_five_hours_only() {
    let store = single("a", FineGrainedSeries::from([(ts("2024-01-01T00:00Z"), Status::Available)]));
    let day_one = normalize(&store, at(1, 2, 0)).unwrap();
    assert!(day_one["a"].summarised_by_hour().contains_key(&ts("2024-01-01T00:00Z")));

    let much_later = normalize(&day_one, at(2, 2, 0)).unwrap();
    assert!(!much_later["a"].summarised_by_hour().contains_key(&ts("2024-01-01T00:00Z")));
    assert!(much_later["a"].summarised_by_hour().contains_key(&ts("2024-01-01T01:00Z")));
}

#[test]
fn stale_single_sample_scenario() {
    let store = single("a", FineGrainedSeries::from([(ts("2024-01-01T00:00Z"), Status::Available)]));
    let out = normalize(&store, at(1, 0, 20)).unwrap();
    let record = &out["a"];
    assert_eq!(
        record.fine_grained_data().get(&ts("2024-01-01T00:15Z")),
        Some(&Status::Unavailable)
    );
    assert!(record.summarised_by_hour().is_empty());
    assert!(record.summarised_by_date().is_empty());
}

#[test]
fn consecutive_cycles_summarise_once() {
    // A fully available hour 00:00-00:55
    let hour: FineGrainedSeries = (0..12)
        .map(|i| (Timestamp::from_datetime(at(1, 0, 5 * i)), Status::Available))
        .collect();
    let store = single("a", hour);

    let cycle = |store: &HistoryStore, now| {
        let combined = record_samples(store, &[Sample::new("a", Status::Available)], now);
        normalize(&combined, now).unwrap()
    };

    let first = cycle(&store, at(1, 1, 0));
    let summary = first["a"].summarised_by_hour()[&ts("2024-01-01T00:00Z")];
    assert_eq!(summary.uptime, 1.0);

    // Overwrite the stored summary to prove the next cycle does not recompute it.
    let record = &first["a"];
    let tampered_hours = record
        .summarised_by_hour()
        .iter()
        .map(|(k, _)| (*k, Summary::new(0.5)))
        .collect();
    let tampered = HistoryStore::from([(
        "a".to_string(),
        NamespaceRecord::new(
            record.fine_grained_data().clone(),
            tampered_hours,
            record.summarised_by_date().clone(),
        ),
    )]);

    let second = cycle(&tampered, at(1, 1, 5));
    assert_eq!(second["a"].summarised_by_hour()[&ts("2024-01-01T00:00Z")].uptime, 0.5);
    assert!(second["a"].fine_grained_data().values().all(|s| *s == Status::Available));
    assert_eq!(second["a"].fine_grained_data().len(), 14);
}

#[test]
fn unknown_targets_are_not_fabricated() {
    let store = single("a", FineGrainedSeries::from([(ts("2024-01-01T00:00Z"), Status::Available)]));
    let out = normalize(&store, at(1, 3, 0)).unwrap();
    assert_eq!(out.keys().collect::<Vec<_>>(), ["a"]);
}
