use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use futures_util::StreamExt;
use sync_logging::{sync_info, sync_warn};

use reelsync_core::{Phase, ProgressRecord, SubmissionPayload};

use crate::adapter::{apply_event, stream_ended_record};
use crate::client::{CatalogClient, ClientSettings, EventStream, ReqwestCatalogClient};
use crate::decode::FrameDecoder;
use crate::monitor::{run_monitor, MonitorSettings, STALL_MESSAGE};
use crate::store::ProgressStore;
use crate::types::{system_clock, Clock, JobClass, SyncError, SyncErrorKind, SyncEvent};

enum SyncCommand {
    PreviewCsv {
        path: PathBuf,
    },
    SubmitImport {
        path: PathBuf,
        payload: SubmissionPayload,
    },
    SubmitRestore {
        path: PathBuf,
    },
    Reset {
        class: JobClass,
    },
}

/// Front door of the engine. Commands go in over a channel; notifications
/// come back over another; job status lives in the shared [`ProgressStore`].
///
/// The background thread owns the async runtime, the staleness monitor, and
/// every read loop. Jobs are detached tasks against the store: dropping or
/// ignoring whatever surface submitted them never cancels the stream.
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<SyncCommand>,
    event_rx: mpsc::Receiver<SyncEvent>,
    store: Arc<ProgressStore>,
}

impl SyncHandle {
    pub fn new(settings: ClientSettings, monitor: MonitorSettings) -> Result<Self, SyncError> {
        let client = Arc::new(ReqwestCatalogClient::new(settings)?);
        Ok(Self::with_client(client, monitor, system_clock()))
    }

    /// Seam for tests and alternative transports.
    pub fn with_client(
        client: Arc<dyn CatalogClient>,
        monitor: MonitorSettings,
        clock: Clock,
    ) -> Self {
        let store = Arc::new(ProgressStore::new());
        let (cmd_tx, cmd_rx) = mpsc::channel::<SyncCommand>();
        let (event_tx, event_rx) = mpsc::channel::<SyncEvent>();

        let task_store = store.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            runtime.spawn(run_monitor(task_store.clone(), monitor, clock.clone()));
            while let Ok(command) = cmd_rx.recv() {
                let client = client.clone();
                let store = task_store.clone();
                let event_tx = event_tx.clone();
                let clock = clock.clone();
                runtime.spawn(async move {
                    handle_command(client, store, event_tx, clock, command).await;
                });
            }
        });

        Self {
            cmd_tx,
            event_rx,
            store,
        }
    }

    pub fn preview_csv(&self, path: impl Into<PathBuf>) {
        let _ = self.cmd_tx.send(SyncCommand::PreviewCsv { path: path.into() });
    }

    pub fn submit_import(&self, path: impl Into<PathBuf>, payload: SubmissionPayload) {
        let _ = self.cmd_tx.send(SyncCommand::SubmitImport {
            path: path.into(),
            payload,
        });
    }

    pub fn submit_restore(&self, path: impl Into<PathBuf>) {
        let _ = self.cmd_tx.send(SyncCommand::SubmitRestore { path: path.into() });
    }

    /// Explicit user reset: drop the record immediately, no grace window.
    pub fn reset(&self, class: JobClass) {
        let _ = self.cmd_tx.send(SyncCommand::Reset { class });
    }

    pub fn try_recv(&self) -> Option<SyncEvent> {
        self.event_rx.try_recv().ok()
    }

    /// The durable store, for observers that outlive this handle's caller.
    pub fn store(&self) -> Arc<ProgressStore> {
        self.store.clone()
    }
}

async fn handle_command(
    client: Arc<dyn CatalogClient>,
    store: Arc<ProgressStore>,
    event_tx: mpsc::Sender<SyncEvent>,
    clock: Clock,
    command: SyncCommand,
) {
    match command {
        SyncCommand::PreviewCsv { path } => match client.preview(&path).await {
            Ok(preview) => {
                let _ = event_tx.send(SyncEvent::PreviewReady(preview));
            }
            Err(error) => {
                let _ = event_tx.send(SyncEvent::PreviewFailed(error));
            }
        },
        SyncCommand::SubmitImport { path, payload } => {
            submit(
                client,
                store,
                event_tx,
                clock,
                JobClass::CsvImport,
                &path,
                Some(payload),
            )
            .await;
        }
        SyncCommand::SubmitRestore { path } => {
            submit(
                client,
                store,
                event_tx,
                clock,
                JobClass::ProfileRestore,
                &path,
                None,
            )
            .await;
        }
        SyncCommand::Reset { class } => {
            store.clear(class);
        }
    }
}

async fn submit(
    client: Arc<dyn CatalogClient>,
    store: Arc<ProgressStore>,
    event_tx: mpsc::Sender<SyncEvent>,
    clock: Clock,
    class: JobClass,
    path: &Path,
    payload: Option<SubmissionPayload>,
) {
    if let Some(payload) = &payload {
        if payload.is_empty() {
            let error = SyncError::new(SyncErrorKind::Validation, "nothing selected");
            let _ = event_tx.send(SyncEvent::SubmitFailed { class, error });
            return;
        }
    }
    // Structural duplicate-submission guard, not just a disabled button.
    if store.read(class).is_some_and(|record| record.processing) {
        let error = SyncError::new(
            SyncErrorKind::Validation,
            format!("a {class} job is already running"),
        );
        let _ = event_tx.send(SyncEvent::SubmitFailed { class, error });
        return;
    }

    let stream = match client.open_job(class, path, payload.as_ref()).await {
        Ok(stream) => stream,
        Err(error) => {
            // The job never entered `processing`; nothing is persisted.
            let _ = event_tx.send(SyncEvent::SubmitFailed { class, error });
            return;
        }
    };

    // A leftover record from an earlier run must not be misread as ours.
    store.clear(class);
    store.write(class, ProgressRecord::started(Phase::Importing, clock()));
    let _ = event_tx.send(SyncEvent::JobStarted(class));
    sync_info!("{class} started ({} selections)", payload.map_or(0, |p| p.len()));

    // Detached on purpose: the read loop answers to the store, not to the
    // scope that submitted the job.
    tokio::spawn(read_loop(class, stream, store, event_tx, clock));
}

async fn read_loop(
    class: JobClass,
    mut stream: EventStream,
    store: Arc<ProgressStore>,
    event_tx: mpsc::Sender<SyncEvent>,
    clock: Clock,
) {
    let mut decoder = FrameDecoder::new();
    let mut store_changed = store.subscribe();

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.push(&bytes) {
                        if apply(class, &store, &event_tx, &clock, event) {
                            return;
                        }
                    }
                }
                Some(Err(error)) => {
                    sync_warn!("{class} stream broke: {error}");
                    let now = clock();
                    if let Some(prior) = store.read(class) {
                        store.write(class, prior.failed(error.to_string(), now));
                    }
                    let _ = event_tx.send(SyncEvent::JobFinished {
                        class,
                        result: Err(error),
                    });
                    return;
                }
                None => {
                    if let Some(event) = decoder.finish() {
                        if apply(class, &store, &event_tx, &clock, event) {
                            return;
                        }
                    }
                    // Physical end without a terminal frame: complete with
                    // the last-known counters instead of hanging.
                    if let Some(prior) = store.read(class) {
                        if prior.processing {
                            let record = stream_ended_record(&prior, clock());
                            let message = record.message.clone().unwrap_or_default();
                            store.write(class, record);
                            let _ = event_tx.send(SyncEvent::JobFinished {
                                class,
                                result: Ok(message),
                            });
                        }
                    }
                    return;
                }
            },
            changed = store_changed.changed() => {
                if changed.is_err() {
                    return;
                }
                match store.read(class) {
                    Some(record) if record.processing => {}
                    Some(record) => {
                        // The monitor force-terminated the job underneath us.
                        let result = match (record.message, record.error) {
                            (_, Some(error)) => {
                                Err(SyncError::new(SyncErrorKind::Stall, error))
                            }
                            (Some(message), None) => Ok(message),
                            (None, None) => Err(SyncError::new(
                                SyncErrorKind::Stall,
                                STALL_MESSAGE.to_string(),
                            )),
                        };
                        let _ = event_tx.send(SyncEvent::JobFinished { class, result });
                        return;
                    }
                    None => {
                        sync_info!("{class} record cleared mid-stream; stopping the reader");
                        return;
                    }
                }
            }
        }
    }
}

/// Fold one event into the store; true means the job reached a terminal
/// state and reading must stop.
fn apply(
    class: JobClass,
    store: &ProgressStore,
    event_tx: &mpsc::Sender<SyncEvent>,
    clock: &Clock,
    event: reelsync_core::StreamEvent,
) -> bool {
    let now = clock();
    let prior = store
        .read(class)
        .unwrap_or_else(|| ProgressRecord::started(Phase::Importing, now));
    let Some(applied) = apply_event(class, &prior, event, now) else {
        return false;
    };
    if let Some(preferences) = applied.preferences {
        let _ = event_tx.send(SyncEvent::PreferencesRestored(preferences));
    }
    store.write(class, applied.record.clone());
    if applied.terminal {
        let result = match (&applied.record.message, &applied.record.error) {
            (_, Some(error)) => Err(SyncError::new(SyncErrorKind::Stream, error.clone())),
            (Some(message), None) => Ok(message.clone()),
            (None, None) => Ok(String::new()),
        };
        let _ = event_tx.send(SyncEvent::JobFinished { class, result });
        return true;
    }
    false
}
