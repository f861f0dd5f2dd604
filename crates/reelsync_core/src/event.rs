use serde::Deserialize;

/// One decoded frame from the job stream.
///
/// Classification is by shape, in precedence order: an `error` field wins,
/// then `import_complete`, then `done`, then a bare progress tick. A payload
/// matching none of these is a parse error and is skipped upstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Error(ErrorEvent),
    ImportComplete(ImportCompleteEvent),
    Done(DoneEvent),
    Progress(ProgressEvent),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEvent {
    pub error: String,
}

/// Phase-1 summary of an archive restore. Terminal when `done` is set;
/// otherwise the job continues into per-item enrichment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportCompleteEvent {
    pub import_complete: bool,
    #[serde(default)]
    pub movies_imported: u64,
    #[serde(default)]
    pub movies_failed: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub tmdb_data_fetched: Option<u64>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DoneEvent {
    pub done: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub processed: Option<u64>,
    #[serde(default)]
    pub removed: Option<u64>,
}

/// Incremental counters. The fourth counter arrives as `skipped` during the
/// import phase and `failed` during enrichment; both land in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProgressEvent {
    pub current: u64,
    pub total: u64,
    #[serde(default)]
    pub processed: u64,
    #[serde(default, alias = "failed")]
    pub skipped: u64,
    #[serde(default)]
    pub removed: u64,
}

impl StreamEvent {
    /// Whether this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamEvent::Error(_) => true,
            StreamEvent::ImportComplete(event) => event.done,
            StreamEvent::Done(_) => true,
            StreamEvent::Progress(_) => false,
        }
    }
}

/// Classify one complete frame payload.
pub fn parse_event(payload: &str) -> Result<StreamEvent, serde_json::Error> {
    serde_json::from_str(payload)
}
