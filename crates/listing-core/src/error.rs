//! Error types module
//!
//! All upload failures are unified under [`UploadError`]. The [`ErrorMetadata`]
//! trait lets an error describe how it is surfaced: the inline text shown after
//! "Upload failed: " in a preview, whether a retry makes sense, and the log level
//! it is reported at.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a rejected upload
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "AUTHORIZATION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (selecting the file again may succeed)
    fn is_recoverable(&self) -> bool;

    /// Human-readable message rendered inline in the preview
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The direct-upload endpoint rejected the blob or could not be reached.
    #[error("Authorization failed for {file_name}: {detail}")]
    Authorization {
        file_name: String,
        status: Option<u16>,
        detail: String,
    },

    /// The storage service rejected or dropped the file body.
    #[error("Storage upload failed for {file_name}: {detail}")]
    Storage {
        file_name: String,
        status: Option<u16>,
        detail: String,
    },

    /// The request did not complete in time.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        UploadError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::InvalidResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for UploadError {
    fn from(err: validator::ValidationErrors) -> Self {
        UploadError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn upload_error_static_metadata(err: &UploadError) -> (&'static str, bool, LogLevel) {
    match err {
        UploadError::Authorization { .. } => ("AUTHORIZATION_FAILED", true, LogLevel::Warn),
        UploadError::Storage { .. } => ("STORAGE_UPLOAD_FAILED", true, LogLevel::Warn),
        UploadError::Network(_) => ("NETWORK_ERROR", true, LogLevel::Warn),
        UploadError::InvalidResponse(_) => ("INVALID_RESPONSE", false, LogLevel::Error),
        UploadError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        UploadError::Io(_) => ("IO_ERROR", false, LogLevel::Error),
        UploadError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl UploadError {
    pub fn authorization(
        file_name: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        UploadError::Authorization {
            file_name: file_name.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn storage(
        file_name: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        UploadError::Storage {
            file_name: file_name.into(),
            status,
            detail: detail.into(),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Authorization {
                file_name,
                status: Some(status),
                ..
            } => format!("Error creating Blob for \"{}\". Status: {}", file_name, status),
            UploadError::Authorization {
                file_name, detail, ..
            } => format!("Error creating Blob for \"{}\": {}", file_name, detail),
            UploadError::Storage {
                file_name,
                status: Some(status),
                ..
            } => format!("Error storing \"{}\". Status: {}", file_name, status),
            UploadError::Storage {
                file_name, detail, ..
            } => format!("Error storing \"{}\": {}", file_name, detail),
            UploadError::Network(ref msg) => msg.clone(),
            UploadError::InvalidResponse(_) => "Unexpected response from server".to_string(),
            UploadError::InvalidInput(ref msg) => msg.clone(),
            UploadError::Io(ref err) => format!("Could not read file: {}", err),
            UploadError::InternalWithSource { .. } => "Upload failed".to_string(),
        }
    }
}
