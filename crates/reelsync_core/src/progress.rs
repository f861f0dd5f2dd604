use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ProgressEvent;

/// Which progress model the current counters belong to. Phase-1 and phase-2
/// counters of a two-phase job are never merged into one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Importing,
    Enriching,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Importing => "importing",
            Phase::Enriching => "fetching details",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Counters {
    pub current: u64,
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub removed: u64,
}

impl From<ProgressEvent> for Counters {
    fn from(event: ProgressEvent) -> Self {
        Self {
            current: event.current,
            total: event.total,
            processed: event.processed,
            skipped: event.skipped,
            removed: event.removed,
        }
    }
}

/// The durable store's sole value: the latest known status of one job.
///
/// Terminal records carry exactly one of `message` or `error`. Counters from
/// the last progress event survive into the terminal record so a late
/// observer can still render a post-mortem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub processing: bool,
    pub phase: Phase,
    #[serde(rename = "progress")]
    pub counters: Counters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Fresh record for a job that just entered `processing`.
    pub fn started(phase: Phase, now: DateTime<Utc>) -> Self {
        Self {
            processing: true,
            phase,
            counters: Counters::default(),
            message: None,
            error: None,
            updated_at: now,
        }
    }

    /// Replace the counters and refresh the stamp. Whole-record semantics:
    /// the caller stores the returned value as-is, never field-merged.
    pub fn with_progress(&self, counters: Counters, now: DateTime<Utc>) -> Self {
        Self {
            processing: true,
            phase: self.phase,
            counters,
            message: None,
            error: None,
            updated_at: now,
        }
    }

    /// Flip into the enrichment phase with a fresh progress model.
    pub fn enriching(&self, now: DateTime<Utc>) -> Self {
        Self {
            processing: true,
            phase: Phase::Enriching,
            counters: Counters::default(),
            message: None,
            error: None,
            updated_at: now,
        }
    }

    pub fn completed(&self, message: String, now: DateTime<Utc>) -> Self {
        Self {
            processing: false,
            phase: self.phase,
            counters: self.counters,
            message: Some(message),
            error: None,
            updated_at: now,
        }
    }

    pub fn failed(&self, error: String, now: DateTime<Utc>) -> Self {
        Self {
            processing: false,
            phase: self.phase,
            counters: self.counters,
            message: None,
            error: Some(error),
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.processing
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }

    /// Classify how stale an active record is.
    ///
    /// A record with `current == total > 0` is mid-finalization and is not
    /// stall-eligible; one that has learned no total yet is, since a stream
    /// that hangs before its first tick would otherwise never be detected.
    pub fn classify(&self, now: DateTime<Utc>, thresholds: &StallThresholds) -> Staleness {
        if !self.processing {
            return Staleness::Fresh;
        }
        let age = self.age(now);
        if age >= thresholds.orphan {
            return Staleness::Orphaned;
        }
        let stall_eligible =
            self.counters.total == 0 || self.counters.current < self.counters.total;
        if stall_eligible {
            if age >= thresholds.hard {
                return Staleness::HardStall;
            }
            if age >= thresholds.soft {
                return Staleness::SoftStall;
            }
        }
        Staleness::Fresh
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallThresholds {
    pub soft: Duration,
    pub hard: Duration,
    pub orphan: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    SoftStall,
    HardStall,
    /// Left over from a previous session; cleared rather than resumed.
    Orphaned,
}
