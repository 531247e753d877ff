//! One file's upload: authorization, body streaming, progress and cancellation.

use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

use listing_api_client::ProgressObserver;
use listing_core::{progress_percent, ErrorMetadata, LogLevel, SelectedFile, TransferOutcome};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::DirectUploadBackend;
use crate::events::{TransferEvent, TransferEventKind};

/// Upload task for a single file.
///
/// Every event is emitted only while the cancellation token is untouched, so a
/// cancelled transfer never produces another state change, even if its request
/// completes afterwards.
pub struct Transfer {
    id: Uuid,
    file: SelectedFile,
    endpoint: String,
    backend: Arc<dyn DirectUploadBackend>,
    token: CancellationToken,
    events: mpsc::UnboundedSender<TransferEvent>,
}

impl Transfer {
    pub fn new(
        file: SelectedFile,
        endpoint: impl Into<String>,
        backend: Arc<dyn DirectUploadBackend>,
        events: mpsc::UnboundedSender<TransferEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            endpoint: endpoint.into(),
            backend,
            token: CancellationToken::new(),
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle kept by the preview entry. It has no task until [`TransferHandle::attach`].
    pub fn handle(&self) -> TransferHandle {
        TransferHandle {
            id: self.id,
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            task: None,
            outcome: TransferOutcome::Pending,
        }
    }

    /// Spawn the transfer on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.start())
    }

    #[tracing::instrument(
        name = "transfer",
        skip(self),
        fields(transfer_id = %self.id, filename = %self.file.name, endpoint = %self.endpoint)
    )]
    pub async fn start(self) {
        if self.token.is_cancelled() {
            tracing::debug!("Transfer cancelled before start");
            return;
        }

        tracing::info!(byte_size = self.file.size, "Starting upload");
        self.emit(TransferEventKind::Authorizing);

        let token = self.token.clone();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.execute() => Some(result),
        };

        match result {
            None => tracing::info!("Upload cancelled, request aborted"),
            Some(Ok(signed_id)) => {
                tracing::info!(signed_id = %signed_id, "File was uploaded successfully");
                self.emit(TransferEventKind::Succeeded { signed_id });
            }
            Some(Err(e)) => {
                let error_code = e.error_code();
                let recoverable = e.is_recoverable();
                match e.log_level() {
                    LogLevel::Debug => {
                        tracing::debug!(error = %e, error_code, recoverable, "Upload failed")
                    }
                    LogLevel::Warn => {
                        tracing::warn!(error = %e, error_code, recoverable, "Upload failed")
                    }
                    LogLevel::Error => tracing::error!(
                        error = %e.detailed_message(),
                        error_code,
                        recoverable,
                        "Upload failed"
                    ),
                }
                self.emit(TransferEventKind::Failed {
                    message: e.client_message(),
                });
            }
        }
    }

    async fn execute(&self) -> Result<String, listing_core::UploadError> {
        let blob = self.backend.authorize(&self.endpoint, &self.file).await?;

        let reporter = Arc::new(ProgressReporter {
            transfer_id: self.id,
            file_name: self.file.name.clone(),
            token: self.token.clone(),
            events: self.events.clone(),
            last_percent: AtomicI16::new(-1),
        });
        self.backend.store(&blob, &self.file, reporter).await?;

        Ok(blob.signed_id)
    }

    /// Returns false when the event was suppressed.
    fn emit(&self, kind: TransferEventKind) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.events
            .send(TransferEvent {
                transfer_id: self.id,
                file_name: self.file.name.clone(),
                kind,
            })
            .is_ok()
    }
}

/// Converts byte counts into non-decreasing percentage events.
struct ProgressReporter {
    transfer_id: Uuid,
    file_name: String,
    token: CancellationToken,
    events: mpsc::UnboundedSender<TransferEvent>,
    last_percent: AtomicI16,
}

impl ProgressObserver for ProgressReporter {
    fn bytes_sent(&self, sent: u64, total: u64) {
        if self.token.is_cancelled() {
            return;
        }
        let percent = progress_percent(sent, total);
        let previous = self.last_percent.fetch_max(percent as i16, Ordering::SeqCst);
        if (percent as i16) <= previous {
            return;
        }
        tracing::debug!(transfer_id = %self.transfer_id, percent, "Upload progress");
        let _ = self.events.send(TransferEvent {
            transfer_id: self.transfer_id,
            file_name: self.file_name.clone(),
            kind: TransferEventKind::Progress { percent },
        });
    }
}

/// The orchestrator's reference to a transfer: its cancellation flag, its task
/// once spawned, and the outcome observed so far.
#[derive(Debug)]
pub struct TransferHandle {
    id: Uuid,
    endpoint: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    outcome: TransferOutcome,
}

impl TransferHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn outcome(&self) -> TransferOutcome {
        self.outcome
    }

    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.task = Some(task);
    }

    /// Record a terminal outcome. Ignored once the transfer is terminal.
    pub(crate) fn finish(&mut self, outcome: TransferOutcome) -> bool {
        if self.outcome.is_terminal() || self.token.is_cancelled() {
            return false;
        }
        self.outcome = outcome;
        true
    }

    /// Set the permanent cancellation flag and abort the task if it is running.
    ///
    /// Terminal transfers are left as they are; calling this twice has no
    /// additional effect. Returns true if this call cancelled the transfer.
    pub fn cancel(&mut self) -> bool {
        if self.outcome.is_terminal() {
            return false;
        }
        self.token.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
        self.outcome = TransferOutcome::Cancelled;
        true
    }
}
