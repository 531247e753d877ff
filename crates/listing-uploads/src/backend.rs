//! Seam between transfers and the direct-upload service.

use std::sync::Arc;

use async_trait::async_trait;
use listing_api_client::{compute_checksum, ApiClient, ProgressObserver};
use listing_core::{BlobMetadata, DirectUploadBlob, SelectedFile, UploadError};

/// Direct-upload service used by transfers.
///
/// [`ApiClient`] is the production implementation; tests script their own.
#[async_trait]
pub trait DirectUploadBackend: Send + Sync {
    /// Obtain a signed storage target for `file` from `endpoint`.
    async fn authorize(
        &self,
        endpoint: &str,
        file: &SelectedFile,
    ) -> Result<DirectUploadBlob, UploadError>;

    /// Send the file bytes to the target returned by [`authorize`](Self::authorize).
    async fn store(
        &self,
        blob: &DirectUploadBlob,
        file: &SelectedFile,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), UploadError>;
}

#[async_trait]
impl DirectUploadBackend for ApiClient {
    async fn authorize(
        &self,
        endpoint: &str,
        file: &SelectedFile,
    ) -> Result<DirectUploadBlob, UploadError> {
        let checksum = compute_checksum(file).await?;
        let blob = BlobMetadata::for_file(file, checksum);
        self.create_direct_upload(endpoint, &blob).await
    }

    async fn store(
        &self,
        blob: &DirectUploadBlob,
        file: &SelectedFile,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), UploadError> {
        self.upload_to_storage(&blob.direct_upload, file, observer)
            .await
    }
}
