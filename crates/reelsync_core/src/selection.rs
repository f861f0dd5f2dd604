use std::collections::BTreeMap;

use crate::candidate::{
    normalize_external_key, AddCandidate, AddEntry, DiffPreview, RemoveAction, RemoveCandidate,
    SubmissionPayload,
};

/// Per-candidate flags a user can edit on an add row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFlag {
    Favorite,
    SeenBefore,
}

/// Flag defaults applied while seeding, usually taken from the import preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedDefaults {
    pub favorite: bool,
    pub seen_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionCounts {
    pub to_add: usize,
    pub to_remove: usize,
}

impl SelectionCounts {
    pub fn total(&self) -> usize {
        self.to_add + self.to_remove
    }
}

/// User decisions over one diff preview.
///
/// Adds are keyed by normalized external key, removes by catalog id; both
/// maps are `BTreeMap` so iteration order is deterministic. Every operation
/// is synchronous and total: an absent key is a no-op, never an error, which
/// tolerates a UI dispatching against a stale candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    adds: BTreeMap<String, AddCandidate>,
    removes: BTreeMap<i64, RemoveCandidate>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current selection with default decisions over `preview`.
    ///
    /// Every add candidate starts included, every remove candidate starts
    /// kept. Duplicate keys in the preview collapse to one record.
    pub fn seed(&mut self, preview: &DiffPreview, defaults: SeedDefaults) {
        self.adds.clear();
        self.removes.clear();
        for add in &preview.movies_to_add {
            let key = normalize_external_key(&add.letterboxd_uri);
            self.adds.insert(
                key.clone(),
                AddCandidate {
                    external_key: key,
                    name: add.name.clone(),
                    year: add.year,
                    will_add: true,
                    is_favorite: defaults.favorite,
                    seen_before: defaults.seen_before,
                },
            );
        }
        for remove in &preview.movies_to_remove {
            self.removes.insert(
                remove.id,
                RemoveCandidate {
                    catalog_id: remove.id,
                    title: remove.title.clone(),
                    year: remove.year,
                    action: RemoveAction::Keep,
                },
            );
        }
    }

    pub fn toggle_add(&mut self, key: &str) {
        if let Some(candidate) = self.adds.get_mut(key) {
            candidate.will_add = !candidate.will_add;
        }
    }

    pub fn set_add_flag(&mut self, key: &str, flag: AddFlag, value: bool) {
        if let Some(candidate) = self.adds.get_mut(key) {
            match flag {
                AddFlag::Favorite => candidate.is_favorite = value,
                AddFlag::SeenBefore => candidate.seen_before = value,
            }
        }
    }

    pub fn set_remove_action(&mut self, id: i64, action: RemoveAction) {
        if let Some(candidate) = self.removes.get_mut(&id) {
            candidate.action = action;
        }
    }

    pub fn select_all_remove(&mut self) {
        for candidate in self.removes.values_mut() {
            candidate.action = RemoveAction::Remove;
        }
    }

    /// Live counts of included adds and selected removes. Always computed
    /// from the maps; never cached.
    pub fn counts(&self) -> SelectionCounts {
        SelectionCounts {
            to_add: self.adds.values().filter(|c| c.will_add).count(),
            to_remove: self
                .removes
                .values()
                .filter(|c| c.action == RemoveAction::Remove)
                .count(),
        }
    }

    /// Snapshot the current decisions into a submission payload.
    pub fn payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            movies_to_add: self
                .adds
                .values()
                .filter(|c| c.will_add)
                .map(|c| AddEntry {
                    name: c.name.clone(),
                    year: c.year,
                    letterboxd_uri: c.external_key.clone(),
                    is_favorite: c.is_favorite,
                    seen_before: c.seen_before,
                })
                .collect(),
            movies_to_remove_ids: self
                .removes
                .values()
                .filter(|c| c.action == RemoveAction::Remove)
                .map(|c| c.catalog_id)
                .collect(),
        }
    }

    pub fn adds(&self) -> impl Iterator<Item = &AddCandidate> {
        self.adds.values()
    }

    pub fn removes(&self) -> impl Iterator<Item = &RemoveCandidate> {
        self.removes.values()
    }

    pub fn add(&self, key: &str) -> Option<&AddCandidate> {
        self.adds.get(key)
    }

    pub fn remove(&self, id: i64) -> Option<&RemoveCandidate> {
        self.removes.get(&id)
    }

    pub fn is_seeded(&self) -> bool {
        !self.adds.is_empty() || !self.removes.is_empty()
    }
}
