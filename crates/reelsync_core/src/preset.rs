use serde::{Deserialize, Serialize};

use crate::selection::SeedDefaults;

/// Canonical import preset. Loaded once at startup; legacy shapes are
/// converted by [`normalize_preset`] before anything downstream sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImportPreset {
    #[serde(default)]
    pub default_favorite: bool,
    #[serde(default)]
    pub default_seen_before: bool,
    #[serde(default)]
    pub removals: RemovalRule,
}

/// How remove candidates are preselected at seed time.
///
/// Unknown fields are rejected here so the legacy `exclude` shape cannot be
/// misread as a canonical rule with a defaulted operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RemovalRule {
    #[serde(default)]
    pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Preselect every remove candidate.
    Include,
    /// Leave remove candidates unselected.
    #[default]
    Exclude,
}

impl ImportPreset {
    pub fn seed_defaults(&self) -> SeedDefaults {
        SeedDefaults {
            favorite: self.default_favorite,
            seen_before: self.default_seen_before,
        }
    }

    pub fn preselect_removals(&self) -> bool {
        self.removals.operator == Operator::Include
    }
}

// Pre-migration presets carried `removals: {"exclude": bool}` instead of the
// operator enum.
#[derive(Debug, Deserialize)]
struct LegacyPreset {
    #[serde(default)]
    default_favorite: bool,
    #[serde(default)]
    default_seen_before: bool,
    removals: LegacyRemovalRule,
}

#[derive(Debug, Deserialize)]
struct LegacyRemovalRule {
    exclude: bool,
}

/// Convert any recognized preset shape into the canonical one.
///
/// Canonical input passes through; the legacy `exclude` boolean maps onto the
/// operator enum. Anything else falls back to defaults so a corrupt preset
/// file never blocks an import.
pub fn normalize_preset(raw: serde_json::Value) -> ImportPreset {
    if let Ok(preset) = serde_json::from_value::<ImportPreset>(raw.clone()) {
        return preset;
    }
    if let Ok(legacy) = serde_json::from_value::<LegacyPreset>(raw) {
        return ImportPreset {
            default_favorite: legacy.default_favorite,
            default_seen_before: legacy.default_seen_before,
            removals: RemovalRule {
                operator: if legacy.removals.exclude {
                    Operator::Exclude
                } else {
                    Operator::Include
                },
            },
        };
    }
    ImportPreset::default()
}
