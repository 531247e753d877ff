use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::SelectedFile;

/// Blob attributes sent to the direct-upload endpoint to obtain an upload target
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct BlobMetadata {
    /// File name as selected
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// File size in bytes
    pub byte_size: u64,
    /// Base64-encoded MD5 digest of the file bytes
    #[validate(length(min = 1, message = "Checksum is required"))]
    pub checksum: String,
}

impl BlobMetadata {
    pub fn for_file(file: &SelectedFile, checksum: String) -> Self {
        Self {
            filename: file.name.clone(),
            content_type: file.content_type.clone(),
            byte_size: file.size,
            checksum,
        }
    }
}

/// Request body for `POST {direct_upload_url}`
#[derive(Debug, Serialize)]
pub struct CreateBlobRequest<'a> {
    pub blob: &'a BlobMetadata,
}

/// Where and how to send the file bytes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectUploadTarget {
    /// Storage URL accepting a PUT of the file body
    pub url: String,
    /// Headers that must accompany the PUT (content type, MD5, signatures)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Blob record returned by the direct-upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectUploadBlob {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub key: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub byte_size: Option<u64>,
    #[serde(default)]
    pub checksum: Option<String>,
    /// Opaque signed reference submitted back with the listing form
    pub signed_id: String,
    pub direct_upload: DirectUploadTarget,
}
