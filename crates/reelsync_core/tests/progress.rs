use chrono::{Duration, TimeZone, Utc};
use reelsync_core::{
    status_view, Counters, Phase, ProgressRecord, Staleness, StallThresholds,
};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn thresholds() -> StallThresholds {
    StallThresholds {
        soft: Duration::seconds(10),
        hard: Duration::seconds(30),
        orphan: Duration::minutes(3),
    }
}

#[test]
fn terminal_records_carry_message_xor_error() {
    let now = t0();
    let record = ProgressRecord::started(Phase::Importing, now);
    assert!(record.processing);

    let done = record.completed("Imported 5 movies".to_string(), now);
    assert!(!done.processing);
    assert!(done.message.is_some());
    assert!(done.error.is_none());

    let failed = record.failed("boom".to_string(), now);
    assert!(failed.message.is_none());
    assert!(failed.error.is_some());
}

#[test]
fn progress_updates_replace_counters_and_refresh_the_stamp() {
    let start = t0();
    let record = ProgressRecord::started(Phase::Importing, start);

    let later = start + Duration::seconds(2);
    let updated = record.with_progress(
        Counters {
            current: 3,
            total: 5,
            processed: 2,
            skipped: 1,
            removed: 0,
        },
        later,
    );
    assert_eq!(updated.updated_at, later);
    assert_eq!(updated.counters.current, 3);

    // Counters from the last tick survive into the terminal record.
    let done = updated.completed("Imported 5 movies".to_string(), later + Duration::seconds(1));
    assert_eq!(done.counters.current, 3);
    assert_eq!(done.counters.total, 5);
}

#[test]
fn staleness_classification_follows_the_thresholds() {
    let start = t0();
    let record = ProgressRecord::started(Phase::Importing, start).with_progress(
        Counters {
            current: 1,
            total: 5,
            ..Counters::default()
        },
        start,
    );

    let th = thresholds();
    assert_eq!(record.classify(start + Duration::seconds(5), &th), Staleness::Fresh);
    assert_eq!(
        record.classify(start + Duration::seconds(15), &th),
        Staleness::SoftStall
    );
    assert_eq!(
        record.classify(start + Duration::seconds(45), &th),
        Staleness::HardStall
    );
    assert_eq!(
        record.classify(start + Duration::minutes(5), &th),
        Staleness::Orphaned
    );
}

#[test]
fn record_at_full_progress_is_not_stall_eligible() {
    let start = t0();
    let record = ProgressRecord::started(Phase::Importing, start).with_progress(
        Counters {
            current: 5,
            total: 5,
            ..Counters::default()
        },
        start,
    );
    assert_eq!(
        record.classify(start + Duration::seconds(45), &thresholds()),
        Staleness::Fresh
    );
}

#[test]
fn record_with_no_total_yet_still_stalls() {
    let start = t0();
    let record = ProgressRecord::started(Phase::Importing, start);
    assert_eq!(
        record.classify(start + Duration::seconds(45), &thresholds()),
        Staleness::HardStall
    );
}

#[test]
fn terminal_records_never_classify_as_stalled() {
    let start = t0();
    let record =
        ProgressRecord::started(Phase::Importing, start).failed("boom".to_string(), start);
    assert_eq!(
        record.classify(start + Duration::minutes(10), &thresholds()),
        Staleness::Fresh
    );
}

#[test]
fn durable_record_serializes_with_the_external_field_names() {
    let record = ProgressRecord::started(Phase::Importing, t0()).with_progress(
        Counters {
            current: 2,
            total: 4,
            processed: 1,
            skipped: 1,
            removed: 0,
        },
        t0(),
    );
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["processing"], true);
    assert_eq!(json["progress"]["current"], 2);
    assert!(json.get("timestamp").is_some());
    // Absent message/error are omitted, not null.
    assert!(json.get("message").is_none());
    assert!(json.get("error").is_none());

    let back: ProgressRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn status_view_reads_entirely_from_the_record() {
    assert_eq!(status_view(None).headline, "No job running");

    let record = ProgressRecord::started(Phase::Importing, t0()).with_progress(
        Counters {
            current: 3,
            total: 5,
            processed: 2,
            skipped: 1,
            removed: 0,
        },
        t0(),
    );
    let view = status_view(Some(&record));
    assert_eq!(view.percent, Some(60));
    assert!(view.active);
    assert!(view.headline.contains("3 of 5"));

    let stalled = record.failed("connection may have been lost".to_string(), t0());
    let view = status_view(Some(&stalled));
    assert!(!view.active);
    assert!(view.headline.contains("connection"));
}
