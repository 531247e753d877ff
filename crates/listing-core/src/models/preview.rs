use serde::Serialize;

/// Sub-phase of an active upload, used only for the status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    /// Waiting on the direct-upload endpoint
    Authorizing,
    /// File bytes are being sent to storage
    Sending,
}

/// Status of a preview entry.
///
/// `Preparing -> Uploading -> {Success | Error | Cancelled}`; `Cancelled` is only
/// reachable from `Preparing` or `Uploading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PreviewStatus {
    Preparing,
    Uploading { phase: UploadPhase, percent: u8 },
    Success,
    Error { message: String },
    Cancelled,
}

impl PreviewStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PreviewStatus::Success | PreviewStatus::Error { .. } | PreviewStatus::Cancelled
        )
    }

    /// Progress bar width. Success and error both render at full width.
    pub fn percent(&self) -> u8 {
        match self {
            PreviewStatus::Preparing => 0,
            PreviewStatus::Uploading { percent, .. } => *percent,
            PreviewStatus::Success | PreviewStatus::Error { .. } => 100,
            PreviewStatus::Cancelled => 0,
        }
    }
}

/// Outcome of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl TransferOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferOutcome::Pending)
    }
}

/// Percentage of `sent` over `total`, rounded and clamped to 0..=100.
///
/// An empty file is complete as soon as it is sent.
pub fn progress_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = ((sent as f64 / total as f64) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
