//! Preview entries and their rendering.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use listing_core::{FileSource, PreviewStatus, SelectedFile, UploadPhase};
use serde::Serialize;
use uuid::Uuid;

use crate::transfer::TransferHandle;

const BAR_BASE_CLASS: &str = "h-2 rounded-full transition-all duration-300";

/// One row of the preview pane, keyed by file name.
#[derive(Debug)]
pub struct PreviewEntry {
    id: String,
    file: SelectedFile,
    status: PreviewStatus,
    thumbnail: Option<String>,
    transfer: Option<TransferHandle>,
    created_at: DateTime<Utc>,
}

impl PreviewEntry {
    pub fn new(file: SelectedFile, thumbnail: Option<String>) -> Self {
        Self {
            id: format!("preview-{}", Uuid::new_v4().simple()),
            file,
            status: PreviewStatus::Preparing,
            thumbnail,
            transfer: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file.name
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn status(&self) -> &PreviewStatus {
        &self.status
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transfer(&self) -> Option<&TransferHandle> {
        self.transfer.as_ref()
    }

    pub(crate) fn transfer_mut(&mut self) -> Option<&mut TransferHandle> {
        self.transfer.as_mut()
    }

    pub(crate) fn bind_transfer(&mut self, handle: TransferHandle) {
        self.transfer = Some(handle);
    }

    /// The transfer started and is requesting authorization.
    pub fn begin_upload(&mut self) -> bool {
        if self.status != PreviewStatus::Preparing {
            return false;
        }
        self.status = PreviewStatus::Uploading {
            phase: UploadPhase::Authorizing,
            percent: 0,
        };
        true
    }

    /// Apply a progress report. Percentages never go backwards.
    pub fn record_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        let current = match &self.status {
            PreviewStatus::Preparing => None,
            PreviewStatus::Uploading { percent, .. } => Some(*percent),
            _ => return false,
        };
        if matches!(current, Some(c) if percent < c) {
            return false;
        }
        self.status = PreviewStatus::Uploading {
            phase: UploadPhase::Sending,
            percent,
        };
        true
    }

    pub fn succeed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PreviewStatus::Success;
        true
    }

    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PreviewStatus::Error {
            message: message.into(),
        };
        true
    }

    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PreviewStatus::Cancelled;
        true
    }

    /// Rendered form of the entry. This is the only place status text and
    /// classes are decided.
    pub fn render(&self) -> PreviewView {
        let (bar_color, status_text, status_color) = match &self.status {
            PreviewStatus::Preparing => (
                "bg-blue-600",
                "Preparing upload...".to_string(),
                "text-gray-600",
            ),
            PreviewStatus::Uploading {
                phase: UploadPhase::Authorizing,
                percent,
            } => (
                "bg-blue-600",
                format!("Starting upload... {}%", percent),
                "text-gray-600",
            ),
            PreviewStatus::Uploading {
                phase: UploadPhase::Sending,
                percent,
            } => (
                "bg-blue-600",
                format!("Uploading... {}%", percent),
                "text-gray-600",
            ),
            PreviewStatus::Success => (
                "bg-green-500",
                "Upload complete! ✓".to_string(),
                "text-green-600",
            ),
            PreviewStatus::Error { message } => {
                ("bg-red-500", format!("Upload failed: {}", message), "text-red-600")
            }
            PreviewStatus::Cancelled => (
                "bg-gray-400",
                "Upload cancelled".to_string(),
                "text-gray-600",
            ),
        };

        PreviewView {
            id: self.id.clone(),
            file_name: self.file.name.clone(),
            thumbnail: self.thumbnail.clone(),
            bar_class: format!("{} {}", bar_color, BAR_BASE_CLASS),
            bar_width: self.status.percent(),
            status_text,
            status_class: format!("text-xs {} mt-1", status_color),
            status: self.status.clone(),
        }
    }
}

/// Snapshot of a rendered preview entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewView {
    pub id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub bar_class: String,
    pub bar_width: u8,
    pub status_text: String,
    pub status_class: String,
    pub status: PreviewStatus,
}

impl PreviewView {
    /// HTML fragment for the preview pane.
    pub fn to_html(&self) -> String {
        let name = escape_html(&self.file_name);
        let mut html = format!(
            r#"<div class="relative" id="{}" data-file-name="{}">"#,
            escape_html(&self.id),
            name
        );
        if let Some(src) = &self.thumbnail {
            html.push_str(&format!(
                r#"<img src="{}" class="w-full h-32 object-cover rounded-lg shadow-md">"#,
                escape_html(src)
            ));
        }
        html.push_str(&format!(
            r#"<div class="w-full bg-gray-200 rounded-full h-2 mt-2"><div class="{}" style="width: {}%"></div></div>"#,
            self.bar_class, self.bar_width
        ));
        html.push_str(&format!(
            r#"<p class="{}">{}</p>"#,
            self.status_class,
            escape_html(&self.status_text)
        ));
        html.push_str(&format!(
            r#"<p class="text-xs text-gray-500 truncate">{}</p>"#,
            name
        ));
        html.push_str(&format!(
            r#"<button type="button" class="absolute top-2 right-2 bg-red-500 text-white rounded-full w-6 h-6 text-sm font-bold hover:bg-red-600 transition-colors cursor-pointer z-10" data-file-name="{}">&times;</button>"#,
            name
        ));
        html.push_str("</div>");
        html
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Read an image file into a `data:` URL for its thumbnail.
///
/// Returns `None` for non-images, files over `max_bytes`, and unreadable files;
/// the upload itself is not affected by a missing thumbnail.
pub async fn load_thumbnail(file: &SelectedFile, max_bytes: u64) -> Option<String> {
    if !file.is_image() || file.size > max_bytes {
        return None;
    }

    let data = match &file.source {
        FileSource::Memory(bytes) => bytes.to_vec(),
        FileSource::Path(path) => match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    filename = %file.name,
                    error = %e,
                    "Failed to read file for preview"
                );
                return None;
            }
        },
    };

    Some(format!(
        "data:{};base64,{}",
        file.content_type,
        STANDARD.encode(data)
    ))
}
