use serde::{Deserialize, Serialize};
use url::Url;

/// A source row absent from the catalog, plus the user's decision over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCandidate {
    pub external_key: String,
    pub name: String,
    pub year: Option<i32>,
    pub will_add: bool,
    pub is_favorite: bool,
    pub seen_before: bool,
}

/// A catalog record absent from the source, plus the user's decision over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveCandidate {
    pub catalog_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub action: RemoveAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveAction {
    Keep,
    Remove,
}

/// One to-add row of the preview response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewAdd {
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub letterboxd_uri: String,
}

/// One to-remove row of the preview response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewRemove {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Structured diff returned by the preview service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiffPreview {
    pub movies_to_add: Vec<PreviewAdd>,
    pub movies_to_remove: Vec<PreviewRemove>,
    pub total_to_add: u64,
    pub total_to_remove: u64,
}

/// Write-once submission snapshot. Serialized fields are exactly what the
/// job endpoint consumes; decision metadata never leaks into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub movies_to_add: Vec<AddEntry>,
    pub movies_to_remove_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddEntry {
    pub name: String,
    pub year: Option<i32>,
    pub letterboxd_uri: String,
    pub is_favorite: bool,
    pub seen_before: bool,
}

impl SubmissionPayload {
    pub fn is_empty(&self) -> bool {
        self.movies_to_add.is_empty() && self.movies_to_remove_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.movies_to_add.len() + self.movies_to_remove_ids.len()
    }
}

/// Normalize an external URI so equivalent spellings key the same candidate.
///
/// Scheme and host are case-folded by the URL parser; trailing slashes are
/// dropped. Inputs that do not parse as URLs are keyed by their trimmed text.
pub fn normalize_external_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => {
            let mut key = url.to_string();
            while key.ends_with('/') {
                key.pop();
            }
            key
        }
        Err(_) => trimmed.trim_end_matches('/').to_string(),
    }
}
