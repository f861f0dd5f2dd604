use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reelsync_core::{Counters, Phase, ProgressRecord};
use reelsync_engine::{
    run_monitor, system_clock, JobClass, MonitorSettings, ProgressStore, STALL_MESSAGE,
};

fn fast_settings() -> MonitorSettings {
    MonitorSettings {
        poll_interval: Duration::from_millis(10),
        soft_stall: Duration::from_millis(40),
        hard_stall: Duration::from_millis(80),
        orphan_after: Duration::from_secs(600),
        terminal_grace: Duration::from_millis(150),
    }
}

fn init_logging() {
    sync_logging::initialize_for_tests();
}

async fn wait_for<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn silent_job_is_force_failed_without_further_input() {
    init_logging();
    let store = Arc::new(ProgressStore::new());
    tokio::spawn(run_monitor(store.clone(), fast_settings(), system_clock()));

    let now = Utc::now();
    let record = ProgressRecord::started(Phase::Importing, now).with_progress(
        Counters {
            current: 1,
            total: 5,
            ..Counters::default()
        },
        now,
    );
    store.write(JobClass::CsvImport, record);

    let stalled = wait_for(Duration::from_secs(3), || {
        store
            .read(JobClass::CsvImport)
            .is_some_and(|r| r.is_terminal())
    })
    .await;
    assert!(stalled, "monitor never force-terminated the job");

    let record = store.read(JobClass::CsvImport).unwrap();
    assert_eq!(record.error.as_deref(), Some(STALL_MESSAGE));
    assert!(record.message.is_none());
    // Counters stay readable for a post-mortem.
    assert_eq!(record.counters.current, 1);

    // After the grace window the record is cleared entirely.
    let cleared = wait_for(Duration::from_secs(3), || {
        store.read(JobClass::CsvImport).is_none()
    })
    .await;
    assert!(cleared, "terminal record was never cleared");
}

#[tokio::test]
async fn job_at_full_progress_is_left_alone() {
    init_logging();
    let store = Arc::new(ProgressStore::new());
    tokio::spawn(run_monitor(store.clone(), fast_settings(), system_clock()));

    let now = Utc::now();
    let record = ProgressRecord::started(Phase::Importing, now).with_progress(
        Counters {
            current: 5,
            total: 5,
            ..Counters::default()
        },
        now,
    );
    store.write(JobClass::CsvImport, record);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let record = store.read(JobClass::CsvImport).expect("record kept");
    assert!(record.processing, "finalizing job must not be stall-failed");
}

#[tokio::test]
async fn store_change_signal_wakes_subscribers() {
    let store = Arc::new(ProgressStore::new());
    let mut changed = store.subscribe();

    store.write(
        JobClass::ProfileRestore,
        ProgressRecord::started(Phase::Importing, Utc::now()),
    );
    tokio::time::timeout(Duration::from_secs(1), changed.changed())
        .await
        .expect("change signal")
        .expect("sender alive");

    // A freshly attached observer reconstructs status from read() alone.
    let record = store.read(JobClass::ProfileRestore).expect("record");
    assert!(record.processing);
    assert_eq!(record.phase, Phase::Importing);
}

#[test]
fn adoption_discards_orphans_and_keeps_recent_records() {
    init_logging();
    let store = ProgressStore::new();
    let now = Utc::now();
    let orphan_after = chrono::Duration::minutes(3);

    // Still "processing" but stamped ten minutes ago: a dead session.
    let orphan = ProgressRecord::started(Phase::Importing, now - chrono::Duration::minutes(10));
    store.adopt(JobClass::CsvImport, Some(orphan), now, orphan_after);
    assert!(store.read(JobClass::CsvImport).is_none());

    // A recent terminal record is kept for display.
    let finished = ProgressRecord::started(Phase::Importing, now)
        .completed("Imported 3 movies".to_string(), now);
    store.adopt(JobClass::ProfileRestore, Some(finished), now, orphan_after);
    let record = store.read(JobClass::ProfileRestore).expect("adopted");
    assert_eq!(record.message.as_deref(), Some("Imported 3 movies"));

    store.adopt(JobClass::CsvImport, None, now, orphan_after);
    assert!(store.read(JobClass::CsvImport).is_none());
}

#[test]
fn writes_replace_the_whole_record() {
    let store = ProgressStore::new();
    let now = Utc::now();

    let first = ProgressRecord::started(Phase::Importing, now).with_progress(
        Counters {
            current: 4,
            total: 5,
            processed: 4,
            ..Counters::default()
        },
        now,
    );
    store.write(JobClass::CsvImport, first);

    // A later write with different counters wins outright; nothing merges.
    let second = ProgressRecord::started(Phase::Importing, now).with_progress(
        Counters {
            current: 2,
            total: 5,
            ..Counters::default()
        },
        now + chrono::Duration::seconds(1),
    );
    store.write(JobClass::CsvImport, second.clone());
    assert_eq!(store.read(JobClass::CsvImport), Some(second));
}
