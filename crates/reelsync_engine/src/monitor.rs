use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use sync_logging::{sync_error, sync_info, sync_warn};

use reelsync_core::{Staleness, StallThresholds};

use crate::store::ProgressStore;
use crate::types::{Clock, JobClass};

/// Wording matters here: a stall is a client-visibility failure, not proof
/// the server-side job died.
pub const STALL_MESSAGE: &str =
    "Processing appears to have stopped - the connection may have been lost";

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Kept short relative to the stall thresholds (~1/40) so detection lag
    /// comes from the thresholds, not the polling.
    pub poll_interval: Duration,
    pub soft_stall: Duration,
    pub hard_stall: Duration,
    pub orphan_after: Duration,
    /// How long a terminal record stays readable before it is cleared.
    pub terminal_grace: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(750),
            soft_stall: Duration::from_secs(10),
            hard_stall: Duration::from_secs(30),
            orphan_after: Duration::from_secs(180),
            terminal_grace: Duration::from_secs(8),
        }
    }
}

impl MonitorSettings {
    pub(crate) fn thresholds(&self) -> StallThresholds {
        StallThresholds {
            soft: to_chrono(self.soft_stall),
            hard: to_chrono(self.hard_stall),
            orphan: to_chrono(self.orphan_after),
        }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Watch the durable store for jobs that went quiet.
///
/// Runs as its own detached task; it reads the store on a timer rather than
/// hooking the stream, so it keeps working when the stream task is the thing
/// that died. Terminal records are cleared after the grace window.
pub async fn run_monitor(store: Arc<ProgressStore>, settings: MonitorSettings, clock: Clock) {
    let thresholds = settings.thresholds();
    let grace = to_chrono(settings.terminal_grace);
    let mut ticker = tokio::time::interval(settings.poll_interval);
    // One soft-stall log per quiet episode, keyed by the stamp that went quiet.
    let mut soft_logged: HashMap<JobClass, DateTime<Utc>> = HashMap::new();

    loop {
        ticker.tick().await;
        let now = clock();
        for class in JobClass::ALL {
            let Some(record) = store.read(class) else {
                soft_logged.remove(&class);
                continue;
            };

            if record.is_terminal() {
                soft_logged.remove(&class);
                if record.age(now) >= grace {
                    store.clear(class);
                }
                continue;
            }

            match record.classify(now, &thresholds) {
                Staleness::Fresh => {
                    soft_logged.remove(&class);
                }
                Staleness::SoftStall => {
                    if soft_logged.get(&class) != Some(&record.updated_at) {
                        sync_warn!(
                            "{class} has been quiet for {}s ({} of {})",
                            record.age(now).num_seconds(),
                            record.counters.current,
                            record.counters.total,
                        );
                        soft_logged.insert(class, record.updated_at);
                    }
                }
                Staleness::HardStall => {
                    sync_error!(
                        "{class} stalled after {}s of silence; ending it client-side",
                        record.age(now).num_seconds(),
                    );
                    store.write(class, record.failed(STALL_MESSAGE.to_string(), now));
                    soft_logged.remove(&class);
                }
                Staleness::Orphaned => {
                    sync_info!("Clearing abandoned {class} record");
                    store.clear(class);
                    soft_logged.remove(&class);
                }
            }
        }
    }
}
