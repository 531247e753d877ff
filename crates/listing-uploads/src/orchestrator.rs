//! The widget's single owner of state.

use std::sync::Arc;

use listing_core::{TransferOutcome, UploadConfig};
use tokio::sync::mpsc;

use crate::backend::DirectUploadBackend;
use crate::events::{TransferEvent, TransferEventKind, UiEvent};
use crate::input::FileInput;
use crate::pane::PreviewPane;
use crate::preview::{load_thumbnail, PreviewEntry};
use crate::registry::AttachmentForm;
use crate::transfer::Transfer;

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Used when the file input does not advertise a direct-upload URL
    pub default_endpoint: String,
    /// Largest image that gets an inline thumbnail
    pub preview_max_bytes: u64,
}

impl OrchestratorOptions {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            default_endpoint: config.direct_upload_path.clone(),
            preview_max_bytes: config.preview_max_bytes,
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

/// Owns the preview entries, the preview pane and the form, and applies
/// transfer events to them one at a time.
pub struct UploadOrchestrator<P: PreviewPane> {
    backend: Arc<dyn DirectUploadBackend>,
    options: OrchestratorOptions,
    pane: P,
    form: Option<AttachmentForm>,
    entries: Vec<PreviewEntry>,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: mpsc::UnboundedReceiver<TransferEvent>,
}

impl<P: PreviewPane> UploadOrchestrator<P> {
    /// Without a form, successful uploads are shown but not recorded anywhere.
    pub fn new(
        backend: Arc<dyn DirectUploadBackend>,
        pane: P,
        form: Option<AttachmentForm>,
        options: OrchestratorOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            options,
            pane,
            form,
            entries: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn from_config(
        backend: Arc<dyn DirectUploadBackend>,
        pane: P,
        config: &UploadConfig,
    ) -> Self {
        Self::new(
            backend,
            pane,
            Some(AttachmentForm::new(config.attachment_field.clone())),
            OrchestratorOptions::from_config(config),
        )
    }

    /// Handle a file input change.
    ///
    /// Each file without a preview entry gets one, is mounted on the pane, and
    /// only then has its transfer spawned. Files already shown (including
    /// repeats within this selection) are skipped. The input is cleared
    /// afterwards. Returns the number of transfers started.
    #[tracing::instrument(skip(self, input), fields(files = input.files().len()))]
    pub async fn on_files_selected(&mut self, input: &mut FileInput) -> usize {
        let endpoint = input
            .direct_upload_url()
            .unwrap_or(self.options.default_endpoint.as_str())
            .to_string();
        tracing::debug!(endpoint = %endpoint, "Direct upload URL");

        let files = input.files().to_vec();
        let mut started = 0;
        for file in files {
            if self.entry(&file.name).is_some() {
                tracing::debug!(filename = %file.name, "File already being processed");
                continue;
            }

            let thumbnail = load_thumbnail(&file, self.options.preview_max_bytes).await;
            let mut entry = PreviewEntry::new(file.clone(), thumbnail);
            self.pane.mount(&entry.render());

            let transfer = Transfer::new(
                file,
                endpoint.clone(),
                Arc::clone(&self.backend),
                self.events_tx.clone(),
            );
            let mut handle = transfer.handle();
            handle.attach(transfer.spawn());
            entry.bind_transfer(handle);

            self.entries.push(entry);
            started += 1;
        }

        input.clear();
        started
    }

    /// Cancel the entry's transfer if it is still running, drop its form
    /// references and unmount it. Returns false for unknown names.
    pub fn remove_preview_entry(&mut self, file_name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.file_name() == file_name) else {
            tracing::debug!(filename = %file_name, "No preview to remove");
            return false;
        };
        let mut entry = self.entries.remove(index);

        if let Some(transfer) = entry.transfer_mut() {
            if transfer.cancel() {
                tracing::info!(
                    filename = %file_name,
                    transfer_id = %transfer.id(),
                    "Canceling upload"
                );
            }
        }
        entry.cancel();

        match self.form.as_mut() {
            Some(form) => {
                form.unregister(file_name);
            }
            None => tracing::debug!(filename = %file_name, "No form present, nothing to unregister"),
        }

        self.pane.unmount(entry.id());
        tracing::info!(filename = %file_name, "Removed preview");
        true
    }

    /// Form reset: remove every entry. Returns how many were removed.
    pub fn reset(&mut self) -> usize {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.file_name().to_string())
            .collect();
        names
            .iter()
            .filter(|name| self.remove_preview_entry(name))
            .count()
    }

    /// Remove only the entries whose transfer is still pending. Finished
    /// entries keep their preview and their registered reference.
    pub fn cancel_in_flight(&mut self) -> usize {
        let names: Vec<String> = self
            .entries
            .iter()
            .filter(|e| {
                e.transfer()
                    .is_some_and(|t| t.outcome() == TransferOutcome::Pending)
            })
            .map(|e| e.file_name().to_string())
            .collect();
        names
            .iter()
            .filter(|name| self.remove_preview_entry(name))
            .count()
    }

    /// Apply one transfer event. Events from transfers that were cancelled or
    /// whose entry is gone are dropped. Returns true if the pane was updated.
    pub fn apply_event(&mut self, event: TransferEvent) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.transfer().map(|t| t.id()) == Some(event.transfer_id))
        else {
            tracing::debug!(
                transfer_id = %event.transfer_id,
                filename = %event.file_name,
                "Ignoring event from removed transfer"
            );
            return false;
        };
        if entry.transfer().map_or(true, |t| t.is_cancelled()) {
            return false;
        }

        let changed = match event.kind {
            TransferEventKind::Authorizing => entry.begin_upload(),
            TransferEventKind::Progress { percent } => entry.record_progress(percent),
            TransferEventKind::Succeeded { signed_id } => {
                let finished = entry
                    .transfer_mut()
                    .is_some_and(|t| t.finish(TransferOutcome::Succeeded));
                if !finished {
                    return false;
                }
                match self.form.as_mut() {
                    Some(form) => form.register(entry.file_name(), &signed_id),
                    None => tracing::debug!(
                        filename = %entry.file_name(),
                        "No form present, reference not recorded"
                    ),
                }
                entry.succeed()
            }
            TransferEventKind::Failed { message } => {
                let finished = entry
                    .transfer_mut()
                    .is_some_and(|t| t.finish(TransferOutcome::Failed));
                finished && entry.fail(message)
            }
        };

        if changed {
            self.pane.update(&entry.render());
        }
        changed
    }

    /// Wait for the next transfer event and apply it.
    pub async fn apply_next_event(&mut self) -> Option<bool> {
        let event = self.events_rx.recv().await?;
        Some(self.apply_event(event))
    }

    /// Apply transfer events until no transfer is pending.
    pub async fn settle(&mut self) {
        while self.has_pending() {
            if self.apply_next_event().await.is_none() {
                break;
            }
        }
    }

    /// Event loop over UI and transfer events.
    ///
    /// Returns on [`UiEvent::Shutdown`], or once the UI channel is closed and
    /// every transfer has finished.
    pub async fn run(&mut self, ui_events: &mut mpsc::UnboundedReceiver<UiEvent>) {
        let mut ui_open = true;
        loop {
            if !ui_open && !self.has_pending() {
                break;
            }

            tokio::select! {
                ui_event = ui_events.recv(), if ui_open => match ui_event {
                    Some(UiEvent::FilesSelected(mut input)) => {
                        self.on_files_selected(&mut input).await;
                    }
                    Some(UiEvent::Remove { file_name }) => {
                        self.remove_preview_entry(&file_name);
                    }
                    Some(UiEvent::Reset) => {
                        self.reset();
                    }
                    Some(UiEvent::Shutdown) => {
                        tracing::debug!("Upload event loop shutting down");
                        break;
                    }
                    None => ui_open = false,
                },
                Some(event) = self.events_rx.recv() => {
                    self.apply_event(event);
                }
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|e| {
            e.transfer()
                .is_some_and(|t| t.outcome() == TransferOutcome::Pending)
        })
    }

    pub fn entries(&self) -> &[PreviewEntry] {
        &self.entries
    }

    pub fn entry(&self, file_name: &str) -> Option<&PreviewEntry> {
        self.entries.iter().find(|e| e.file_name() == file_name)
    }

    pub fn form(&self) -> Option<&AttachmentForm> {
        self.form.as_ref()
    }

    pub fn pane(&self) -> &P {
        &self.pane
    }
}
