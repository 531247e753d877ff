use uuid::Uuid;

use crate::input::FileInput;

/// Message from a transfer task to the orchestrator's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub transfer_id: Uuid,
    pub file_name: String,
    pub kind: TransferEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEventKind {
    /// The transfer started and is waiting on the direct-upload endpoint
    Authorizing,
    /// Percentage of the file body handed to the transport
    Progress { percent: u8 },
    Succeeded { signed_id: String },
    Failed { message: String },
}

impl TransferEventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEventKind::Succeeded { .. } | TransferEventKind::Failed { .. }
        )
    }
}

/// User interaction delivered to [`UploadOrchestrator::run`].
///
/// [`UploadOrchestrator::run`]: crate::UploadOrchestrator::run
#[derive(Debug)]
pub enum UiEvent {
    /// File input change event
    FilesSelected(FileInput),
    /// Click on a preview's remove control
    Remove { file_name: String },
    /// Form reset
    Reset,
    /// Stop the event loop without touching remaining entries
    Shutdown,
}
