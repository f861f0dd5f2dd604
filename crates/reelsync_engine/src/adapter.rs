use chrono::{DateTime, Utc};
use sync_logging::sync_warn;

use reelsync_core::{ProgressRecord, StreamEvent};

use crate::types::JobClass;

/// Result of folding one stream event into the durable record.
#[derive(Debug, Clone)]
pub struct Applied {
    pub record: ProgressRecord,
    /// Preferences blob from a restore's phase-1 summary, to apply at once.
    pub preferences: Option<serde_json::Value>,
    pub terminal: bool,
}

/// Fold one decoded event into the next durable record.
///
/// Returns `None` for frames that are valid JSON but wrong for this job
/// class; like a malformed frame, they are skipped rather than terminal.
///
/// For profile restores this is the two-phase adapter: an `import_complete`
/// summary either ends the job (`done` set, enrichment never entered) or
/// flips the record into the enrichment phase with a fresh progress model.
/// Phase-1 and phase-2 counters are never merged.
pub fn apply_event(
    class: JobClass,
    prior: &ProgressRecord,
    event: StreamEvent,
    now: DateTime<Utc>,
) -> Option<Applied> {
    match event {
        StreamEvent::Progress(progress) => Some(Applied {
            record: prior.with_progress(progress.into(), now),
            preferences: None,
            terminal: false,
        }),
        StreamEvent::Error(event) => Some(Applied {
            record: prior.failed(event.error, now),
            preferences: None,
            terminal: true,
        }),
        StreamEvent::Done(event) => {
            let message = event.message.unwrap_or_else(|| {
                format!(
                    "Completed: {} processed, {} removed",
                    event.processed.unwrap_or(prior.counters.processed),
                    event.removed.unwrap_or(prior.counters.removed),
                )
            });
            Some(Applied {
                record: prior.completed(message, now),
                preferences: None,
                terminal: true,
            })
        }
        StreamEvent::ImportComplete(event) => {
            if class != JobClass::ProfileRestore {
                sync_warn!("Skipping import_complete frame on a {class} job");
                return None;
            }
            if event.done {
                let message = format!(
                    "Restored {} movies ({} failed, {} details fetched)",
                    event.movies_imported,
                    event.movies_failed,
                    event.tmdb_data_fetched.unwrap_or(0),
                );
                Some(Applied {
                    record: prior.completed(message, now),
                    preferences: event.preferences,
                    terminal: true,
                })
            } else {
                Some(Applied {
                    record: prior.enriching(now),
                    preferences: event.preferences,
                    terminal: false,
                })
            }
        }
    }
}

/// Terminal record for a transport that closed without a terminal frame.
/// Completing with the last-known counters beats hanging forever.
pub fn stream_ended_record(prior: &ProgressRecord, now: DateTime<Utc>) -> ProgressRecord {
    let counters = prior.counters;
    prior.completed(
        format!(
            "Completed: {} processed, {} removed",
            counters.processed, counters.removed
        ),
        now,
    )
}
