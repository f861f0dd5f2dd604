use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use sync_logging::{sync_debug, sync_info};
use tokio::sync::watch;

use reelsync_core::ProgressRecord;

use crate::types::JobClass;

/// Process-wide progress cell, keyed by job class and owned by nobody's
/// UI scope. Any observer reconstructs full job status from `read` alone;
/// `subscribe` adds a change signal for observers that prefer not to poll.
///
/// Writes replace the whole record (last write wins on its stamp) so an
/// out-of-order event can never resurrect individual counters.
#[derive(Debug)]
pub struct ProgressStore {
    records: Mutex<HashMap<JobClass, ProgressRecord>>,
    changed: watch::Sender<u64>,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            records: Mutex::new(HashMap::new()),
            changed,
        }
    }

    pub fn write(&self, class: JobClass, record: ProgressRecord) {
        self.records
            .lock()
            .expect("lock progress records")
            .insert(class, record);
        self.notify();
    }

    pub fn read(&self, class: JobClass) -> Option<ProgressRecord> {
        self.records
            .lock()
            .expect("lock progress records")
            .get(&class)
            .cloned()
    }

    pub fn clear(&self, class: JobClass) {
        let removed = self
            .records
            .lock()
            .expect("lock progress records")
            .remove(&class);
        if removed.is_some() {
            sync_debug!("Cleared progress record for {class}");
            self.notify();
        }
    }

    /// Change signal; the payload is a write counter, not the record itself.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    /// Snapshot of every record, for mirroring to disk.
    pub fn snapshot(&self) -> HashMap<JobClass, ProgressRecord> {
        self.records.lock().expect("lock progress records").clone()
    }

    /// Take over a record persisted by a previous process.
    ///
    /// A record still marked processing after `orphan_after` belonged to a
    /// session whose transport connection cannot be resumed; it is dropped
    /// instead of adopted. Anything younger, or terminal, is kept for
    /// display.
    pub fn adopt(
        &self,
        class: JobClass,
        persisted: Option<ProgressRecord>,
        now: DateTime<Utc>,
        orphan_after: Duration,
    ) {
        let Some(record) = persisted else {
            return;
        };
        if record.processing && record.age(now) >= orphan_after {
            sync_info!(
                "Discarding orphaned {class} job from a previous session ({}s old)",
                record.age(now).num_seconds()
            );
            return;
        }
        self.write(class, record);
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }
}
