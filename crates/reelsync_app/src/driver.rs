use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sync_logging::{sync_info, sync_warn};

use reelsync_core::{status_view, DiffPreview, SelectionState};
use reelsync_engine::{ClientSettings, JobClass, MonitorSettings, SyncEvent, SyncHandle};

use crate::persistence;

pub(crate) enum Command {
    Import { csv: PathBuf, remove_all: bool },
    Restore { archive: PathBuf },
    Status,
    Reset,
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn run(command: Command) -> Result<(), String> {
    let state_dir = state_dir();
    let monitor = MonitorSettings::default();
    let orphan_after = chrono::Duration::from_std(monitor.orphan_after)
        .unwrap_or(chrono::Duration::MAX);

    let handle =
        SyncHandle::new(client_settings(), monitor).map_err(|error| error.to_string())?;
    let store = handle.store();
    persistence::adopt_persisted(&store, &state_dir, Utc::now(), orphan_after);

    match command {
        Command::Status => {
            for class in JobClass::ALL {
                let view = status_view(store.read(class).as_ref());
                println!("{}: {}", class, view.headline);
            }
            Ok(())
        }
        Command::Reset => {
            handle.reset(JobClass::CsvImport);
            handle.reset(JobClass::ProfileRestore);
            // Give the engine thread a beat to process the clears.
            std::thread::sleep(Duration::from_millis(200));
            persistence::save_progress(&state_dir, &store);
            println!("Progress state cleared.");
            Ok(())
        }
        Command::Import { csv, remove_all } => {
            run_import(&handle, &state_dir, csv, remove_all)
        }
        Command::Restore { archive } => {
            handle.submit_restore(archive);
            follow_job(&handle, &state_dir, JobClass::ProfileRestore)
        }
    }
}

fn run_import(
    handle: &SyncHandle,
    state_dir: &std::path::Path,
    csv: PathBuf,
    remove_all: bool,
) -> Result<(), String> {
    let preset = persistence::load_preset(state_dir);

    handle.preview_csv(&csv);
    let preview = wait_for_preview(handle)?;
    println!(
        "Preview: {} to add, {} to remove",
        preview.total_to_add, preview.total_to_remove
    );

    let mut selection = SelectionState::new();
    selection.seed(&preview, preset.seed_defaults());
    if remove_all || preset.preselect_removals() {
        selection.select_all_remove();
    }

    let counts = selection.counts();
    if counts.total() == 0 {
        return Err("nothing selected; the catalog is already in sync".to_string());
    }
    println!(
        "Submitting {} additions and {} removals",
        counts.to_add, counts.to_remove
    );

    handle.submit_import(csv, selection.payload());
    follow_job(handle, state_dir, JobClass::CsvImport)
}

fn wait_for_preview(handle: &SyncHandle) -> Result<DiffPreview, String> {
    let start = Instant::now();
    while start.elapsed() < PREVIEW_TIMEOUT {
        match handle.try_recv() {
            Some(SyncEvent::PreviewReady(preview)) => return Ok(preview),
            Some(SyncEvent::PreviewFailed(error)) => return Err(error.to_string()),
            Some(other) => sync_warn!("Unexpected engine event while previewing: {other:?}"),
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
    Err("preview timed out".to_string())
}

/// Tail the durable store until the job ends, mirroring every change to
/// disk so a later process can pick the status back up.
fn follow_job(
    handle: &SyncHandle,
    state_dir: &std::path::Path,
    class: JobClass,
) -> Result<(), String> {
    let store = handle.store();
    let mut last_printed: Option<DateTime<Utc>> = None;

    loop {
        while let Some(event) = handle.try_recv() {
            match event {
                SyncEvent::SubmitFailed { error, .. } => return Err(error.to_string()),
                SyncEvent::JobStarted(class) => {
                    sync_info!("{class} started");
                }
                SyncEvent::PreferencesRestored(preferences) => {
                    println!("Applying restored preferences");
                    sync_info!("Restored preferences payload: {preferences}");
                }
                SyncEvent::JobFinished { result, .. } => {
                    persistence::save_progress(state_dir, &store);
                    return match result {
                        Ok(message) => {
                            println!("{message}");
                            Ok(())
                        }
                        Err(error) => Err(error.to_string()),
                    };
                }
                SyncEvent::PreviewReady(_) | SyncEvent::PreviewFailed(_) => {}
            }
        }

        if let Some(record) = store.read(class) {
            if last_printed != Some(record.updated_at) {
                let view = status_view(Some(&record));
                match view.percent {
                    Some(percent) => println!("[{percent:>3}%] {}", view.headline),
                    None => println!("{}", view.headline),
                }
                persistence::save_progress(state_dir, &store);
                last_printed = Some(record.updated_at);
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn state_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".reelsync")
}

fn client_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(base_url) = std::env::var("REELSYNC_BASE_URL") {
        settings.base_url = base_url;
    }
    settings
}
