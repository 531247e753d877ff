//! Listing Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the direct-upload client, the upload orchestrator and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::UploadConfig;
pub use error::{ErrorMetadata, LogLevel, UploadError};
pub use models::{
    progress_percent, BlobMetadata, DirectUploadBlob, DirectUploadTarget, FileSource,
    PreviewStatus, SelectedFile, TransferOutcome, UploadPhase,
};
