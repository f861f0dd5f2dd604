use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reelsync_core::DiffPreview;

/// Injected time source so staleness logic is testable without real waits.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// The two job families the engine runs. One logical job at a time per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobClass {
    CsvImport,
    ProfileRestore,
}

impl JobClass {
    pub const ALL: [JobClass; 2] = [JobClass::CsvImport, JobClass::ProfileRestore];

    pub fn label(&self) -> &'static str {
        match self {
            JobClass::CsvImport => "csv import",
            JobClass::ProfileRestore => "profile restore",
        }
    }

    pub(crate) fn expected_extension(&self) -> &'static str {
        match self {
            JobClass::CsvImport => "csv",
            JobClass::ProfileRestore => "zip",
        }
    }

    pub(crate) fn job_endpoint(&self) -> &'static str {
        match self {
            JobClass::CsvImport => "/api/import/execute",
            JobClass::ProfileRestore => "/api/restore/execute",
        }
    }
}

impl fmt::Display for JobClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub message: String,
}

impl SyncError {
    pub(crate) fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Rejected before any network call; nothing persisted.
    Validation,
    /// Request never produced a usable response; the job never started.
    Transport,
    /// Explicit error frame from the job; terminal.
    Stream,
    /// One malformed frame; logged and skipped, never terminal.
    Parse,
    /// Synthesized by the staleness monitor; the server job may still run.
    Stall,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::Validation => write!(f, "validation error"),
            SyncErrorKind::Transport => write!(f, "transport error"),
            SyncErrorKind::Stream => write!(f, "stream error"),
            SyncErrorKind::Parse => write!(f, "parse error"),
            SyncErrorKind::Stall => write!(f, "stall"),
        }
    }
}

/// Engine-to-observer notifications. Job status itself always lives in the
/// durable store; these only signal moments an observer may want to react to.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    PreviewReady(DiffPreview),
    PreviewFailed(SyncError),
    /// Validation or transport failure before the job entered `processing`.
    SubmitFailed { class: JobClass, error: SyncError },
    JobStarted(JobClass),
    /// Preferences blob embedded in a restore's phase-1 summary.
    PreferencesRestored(serde_json::Value),
    JobFinished {
        class: JobClass,
        result: Result<String, SyncError>,
    },
}
