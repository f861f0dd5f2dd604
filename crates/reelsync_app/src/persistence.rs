use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sync_logging::{sync_error, sync_info, sync_warn};

use reelsync_core::{normalize_preset, ImportPreset, ProgressRecord};
use reelsync_engine::{load_state_file, write_state_file, JobClass, ProgressStore};

const PROGRESS_FILENAME: &str = ".reelsync_progress.ron";
const PRESET_FILENAME: &str = ".reelsync_preset.json";

/// On-disk mirror of the durable progress store, one slot per job class.
/// This is what lets orphan detection inspect jobs from a previous process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedProgress {
    csv_import: Option<ProgressRecord>,
    profile_restore: Option<ProgressRecord>,
}

pub(crate) fn adopt_persisted(
    store: &ProgressStore,
    state_dir: &Path,
    now: DateTime<Utc>,
    orphan_after: chrono::Duration,
) {
    let persisted = load_progress(state_dir);
    store.adopt(JobClass::CsvImport, persisted.csv_import, now, orphan_after);
    store.adopt(
        JobClass::ProfileRestore,
        persisted.profile_restore,
        now,
        orphan_after,
    );
}

pub(crate) fn save_progress(state_dir: &Path, store: &ProgressStore) {
    let snapshot = store.snapshot();
    let state = PersistedProgress {
        csv_import: snapshot.get(&JobClass::CsvImport).cloned(),
        profile_restore: snapshot.get(&JobClass::ProfileRestore).cloned(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            sync_error!("Failed to serialize progress snapshot: {}", err);
            return;
        }
    };

    if let Err(err) = write_state_file(state_dir, PROGRESS_FILENAME, &content) {
        sync_error!(
            "Failed to write progress snapshot to {:?}: {}",
            state_dir,
            err
        );
    }
}

fn load_progress(state_dir: &Path) -> PersistedProgress {
    let content = match load_state_file(state_dir, PROGRESS_FILENAME) {
        Ok(Some(text)) => text,
        Ok(None) => return PersistedProgress::default(),
        Err(err) => {
            sync_warn!("Failed to read progress snapshot from {:?}: {}", state_dir, err);
            return PersistedProgress::default();
        }
    };

    match ron::from_str(&content) {
        Ok(state) => {
            sync_info!("Loaded progress snapshot from {:?}", state_dir);
            state
        }
        Err(err) => {
            sync_warn!("Failed to parse progress snapshot from {:?}: {}", state_dir, err);
            PersistedProgress::default()
        }
    }
}

/// Load the import preset, converting any legacy shape to canonical.
pub(crate) fn load_preset(state_dir: &Path) -> ImportPreset {
    let content = match load_state_file(state_dir, PRESET_FILENAME) {
        Ok(Some(text)) => text,
        Ok(None) => return ImportPreset::default(),
        Err(err) => {
            sync_warn!("Failed to read preset from {:?}: {}", state_dir, err);
            return ImportPreset::default();
        }
    };

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => normalize_preset(value),
        Err(err) => {
            sync_warn!("Failed to parse preset from {:?}: {}", state_dir, err);
            ImportPreset::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{adopt_persisted, load_preset, save_progress, PRESET_FILENAME};
    use chrono::Utc;
    use reelsync_core::{Operator, Phase, ProgressRecord};
    use reelsync_engine::{write_state_file, JobClass, ProgressStore};

    fn init_logging() {
        sync_logging::initialize_for_tests();
    }

    #[test]
    fn progress_snapshot_round_trips_through_disk() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        let store = ProgressStore::new();
        store.write(
            JobClass::CsvImport,
            ProgressRecord::started(Phase::Importing, now).completed("Imported 2 movies".into(), now),
        );
        save_progress(dir.path(), &store);

        let restored = ProgressStore::new();
        adopt_persisted(&restored, dir.path(), now, chrono::Duration::minutes(3));
        let record = restored.read(JobClass::CsvImport).expect("adopted record");
        assert_eq!(record.message.as_deref(), Some("Imported 2 movies"));
        assert!(restored.read(JobClass::ProfileRestore).is_none());
    }

    #[test]
    fn stale_processing_snapshot_is_not_adopted() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let old = Utc::now() - chrono::Duration::minutes(10);

        let store = ProgressStore::new();
        store.write(
            JobClass::CsvImport,
            ProgressRecord::started(Phase::Importing, old),
        );
        save_progress(dir.path(), &store);

        let restored = ProgressStore::new();
        adopt_persisted(&restored, dir.path(), Utc::now(), chrono::Duration::minutes(3));
        assert!(restored.read(JobClass::CsvImport).is_none());
    }

    #[test]
    fn missing_or_corrupt_state_falls_back_to_defaults() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();

        let store = ProgressStore::new();
        adopt_persisted(&store, dir.path(), Utc::now(), chrono::Duration::minutes(3));
        assert!(store.read(JobClass::CsvImport).is_none());

        write_state_file(dir.path(), super::PROGRESS_FILENAME, "(not ron").unwrap();
        adopt_persisted(&store, dir.path(), Utc::now(), chrono::Duration::minutes(3));
        assert!(store.read(JobClass::CsvImport).is_none());
    }

    #[test]
    fn legacy_preset_shape_is_normalized_on_load() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        write_state_file(
            dir.path(),
            PRESET_FILENAME,
            r#"{"default_favorite": true, "removals": {"exclude": false}}"#,
        )
        .unwrap();

        let preset = load_preset(dir.path());
        assert!(preset.default_favorite);
        assert_eq!(preset.removals.operator, Operator::Include);
        assert!(preset.preselect_removals());
    }
}
