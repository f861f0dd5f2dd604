//! Reelsync core: pure selection state, stream events, and progress records.
mod candidate;
mod event;
mod preset;
mod progress;
mod selection;
mod view_model;

pub use candidate::{
    normalize_external_key, AddCandidate, AddEntry, DiffPreview, PreviewAdd, PreviewRemove,
    RemoveAction, RemoveCandidate, SubmissionPayload,
};
pub use event::{parse_event, DoneEvent, ErrorEvent, ImportCompleteEvent, ProgressEvent, StreamEvent};
pub use preset::{normalize_preset, ImportPreset, Operator, RemovalRule};
pub use progress::{Counters, Phase, ProgressRecord, Staleness, StallThresholds};
pub use selection::{AddFlag, SeedDefaults, SelectionCounts, SelectionState};
pub use view_model::{status_view, StatusView};
