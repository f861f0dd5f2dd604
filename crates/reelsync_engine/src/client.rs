use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::multipart;
use sync_logging::sync_debug;

use reelsync_core::{DiffPreview, SubmissionPayload};

use crate::types::{JobClass, SyncError, SyncErrorKind};

const PREVIEW_ENDPOINT: &str = "/api/import/preview";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub max_file_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Chunked body of a running job. Transport failures surface as items so the
/// read loop can finalize the durable record instead of hanging.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Bytes, SyncError>> + Send>>;

#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// One-shot diff preview of the source file. No retries; a failed
    /// preview just lets the user re-pick a file.
    async fn preview(&self, file: &Path) -> Result<DiffPreview, SyncError>;

    /// Upload the source file (plus the selection, for CSV imports) and open
    /// the job's event stream.
    async fn open_job(
        &self,
        class: JobClass,
        file: &Path,
        payload: Option<&SubmissionPayload>,
    ) -> Result<EventStream, SyncError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestCatalogClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestCatalogClient {
    pub fn new(settings: ClientSettings) -> Result<Self, SyncError> {
        // Connect timeout only. A whole-request timeout would kill slow but
        // healthy jobs; the staleness monitor is the one that bounds silence.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| SyncError::new(SyncErrorKind::Transport, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Local checks before any network round trip.
    fn validate_file(&self, file: &Path, expected_extension: &str) -> Result<(), SyncError> {
        let extension = file
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if !extension.eq_ignore_ascii_case(expected_extension) {
            return Err(SyncError::new(
                SyncErrorKind::Validation,
                format!("unsupported file type: expected .{expected_extension}"),
            ));
        }
        let metadata = std::fs::metadata(file)
            .map_err(|err| SyncError::new(SyncErrorKind::Validation, err.to_string()))?;
        if metadata.len() > self.settings.max_file_bytes {
            return Err(SyncError::new(
                SyncErrorKind::Validation,
                format!(
                    "file too large ({} bytes, limit {})",
                    metadata.len(),
                    self.settings.max_file_bytes
                ),
            ));
        }
        Ok(())
    }

    async fn file_part(&self, file: &Path, mime: &str) -> Result<multipart::Part, SyncError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|err| SyncError::new(SyncErrorKind::Validation, err.to_string()))?;
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime)
            .map_err(|err| SyncError::new(SyncErrorKind::Transport, err.to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogClient for ReqwestCatalogClient {
    async fn preview(&self, file: &Path) -> Result<DiffPreview, SyncError> {
        self.validate_file(file, "csv")?;
        let form = multipart::Form::new().part("file", self.file_part(file, "text/csv").await?);

        let response = self
            .client
            .post(self.endpoint(PREVIEW_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::new(SyncErrorKind::Transport, status.to_string()));
        }
        response
            .json::<DiffPreview>()
            .await
            .map_err(transport_error)
    }

    async fn open_job(
        &self,
        class: JobClass,
        file: &Path,
        payload: Option<&SubmissionPayload>,
    ) -> Result<EventStream, SyncError> {
        self.validate_file(file, class.expected_extension())?;

        let mime = match class {
            JobClass::CsvImport => "text/csv",
            JobClass::ProfileRestore => "application/zip",
        };
        let mut form = multipart::Form::new().part("file", self.file_part(file, mime).await?);
        if let Some(payload) = payload {
            let selections = serde_json::to_string(payload)
                .map_err(|err| SyncError::new(SyncErrorKind::Validation, err.to_string()))?;
            form = form.text("selections", selections);
        }

        let response = self
            .client
            .post(self.endpoint(class.job_endpoint()))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::new(SyncErrorKind::Transport, status.to_string()));
        }

        sync_debug!("{class} stream opened");
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(transport_error)),
        ))
    }
}

fn transport_error(err: reqwest::Error) -> SyncError {
    SyncError::new(SyncErrorKind::Transport, err.to_string())
}
