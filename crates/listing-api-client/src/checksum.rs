//! Blob checksums as expected by the direct-upload endpoint: the base64-encoded
//! MD5 digest of the file bytes (the same value storage checks as `Content-MD5`).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use listing_core::constants::UPLOAD_CHUNK_SIZE;
use listing_core::{FileSource, SelectedFile, UploadError};
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

/// Compute the checksum, streaming the file from disk in fixed-size chunks.
#[tracing::instrument(skip(file), fields(filename = %file.name, byte_size = file.size))]
pub async fn compute_checksum(file: &SelectedFile) -> Result<String, UploadError> {
    let mut hasher = Md5::new();

    match &file.source {
        FileSource::Memory(data) => hasher.update(data),
        FileSource::Path(path) => {
            let mut reader = tokio::fs::File::open(path).await?;
            let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
            loop {
                let n = reader.read(&mut buffer).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
        }
    }

    let checksum = STANDARD.encode(hasher.finalize());
    tracing::debug!(checksum = %checksum, "Computed blob checksum");
    Ok(checksum)
}
