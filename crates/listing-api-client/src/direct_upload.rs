//! Direct-upload protocol: create a blob record to obtain a signed storage
//! target, then PUT the file bytes straight to storage.

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use listing_core::constants::UPLOAD_CHUNK_SIZE;
use listing_core::models::CreateBlobRequest;
use listing_core::{
    BlobMetadata, DirectUploadBlob, DirectUploadTarget, FileSource, SelectedFile, UploadError,
};
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use tokio_util::io::ReaderStream;
use validator::Validate;

use crate::ApiClient;

/// Receives byte counts as the file body is handed to the transport.
pub trait ProgressObserver: Send + Sync {
    fn bytes_sent(&self, sent: u64, total: u64);
}

impl<F> ProgressObserver for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn bytes_sent(&self, sent: u64, total: u64) {
        self(sent, total)
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

impl ApiClient {
    /// Create the blob record and return its signed id and storage target.
    #[tracing::instrument(skip(self, blob), fields(filename = %blob.filename, byte_size = blob.byte_size))]
    pub async fn create_direct_upload(
        &self,
        endpoint: &str,
        blob: &BlobMetadata,
    ) -> Result<DirectUploadBlob, UploadError> {
        blob.validate()?;

        let url = self.build_url(endpoint);
        let request = self
            .client()
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&CreateBlobRequest { blob });
        let request = self.apply_auth(request);

        let response = request
            .send()
            .await
            .map_err(|e| {
                send_failure(e, &blob.filename, |detail| {
                    UploadError::authorization(&blob.filename, None, detail)
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, url = %url, "Direct upload endpoint rejected blob");
            return Err(UploadError::authorization(
                &blob.filename,
                Some(status.as_u16()),
                error_text,
            ));
        }

        let created: DirectUploadBlob = response.json().await.map_err(|e| {
            UploadError::InvalidResponse(format!("Failed to parse blob response: {}", e))
        })?;

        tracing::debug!(signed_id = %created.signed_id, "Blob record created");
        Ok(created)
    }

    /// Stream the file body to the storage target, reporting progress per chunk.
    #[tracing::instrument(skip(self, target, file, observer), fields(filename = %file.name, byte_size = file.size))]
    pub async fn upload_to_storage(
        &self,
        target: &DirectUploadTarget,
        file: &SelectedFile,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), UploadError> {
        let stream = progress_stream(body_stream(file).await?, file.size, observer);

        let mut request = self
            .client()
            .put(self.build_url(&target.url))
            .header(CONTENT_LENGTH, file.size);
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| {
                send_failure(e, &file.name, |detail| {
                    UploadError::storage(&file.name, None, detail)
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, "Storage rejected file body");
            return Err(UploadError::storage(
                &file.name,
                Some(status.as_u16()),
                error_text,
            ));
        }

        Ok(())
    }
}

/// Timeouts become network errors; other send failures belong to the step.
fn send_failure(
    err: reqwest::Error,
    file_name: &str,
    step_error: impl FnOnce(String) -> UploadError,
) -> UploadError {
    if err.is_timeout() {
        tracing::warn!(filename = %file_name, error = %err, "Request timed out");
        UploadError::Network(format!("Request for \"{}\" timed out", file_name))
    } else {
        step_error(err.to_string())
    }
}

async fn body_stream(file: &SelectedFile) -> Result<ByteStream, UploadError> {
    match &file.source {
        FileSource::Path(path) => {
            let reader = tokio::fs::File::open(path).await?;
            Ok(Box::pin(ReaderStream::with_capacity(
                reader,
                UPLOAD_CHUNK_SIZE,
            )))
        }
        FileSource::Memory(data) => {
            let chunks: Vec<Result<Bytes, io::Error>> = data
                .chunks(UPLOAD_CHUNK_SIZE)
                .map(|chunk| Ok(data.slice_ref(chunk)))
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }
}

fn progress_stream(
    inner: ByteStream,
    total: u64,
    observer: Arc<dyn ProgressObserver>,
) -> ByteStream {
    let mut sent = 0u64;
    Box::pin(inner.map(move |chunk| {
        if let Ok(bytes) = &chunk {
            sent += bytes.len() as u64;
            observer.bytes_sent(sent, total);
        }
        chunk
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Auth;
    use listing_core::ErrorMetadata;
    use std::sync::Mutex;
    use std::time::Duration;

    fn blob_for(file: &SelectedFile) -> BlobMetadata {
        BlobMetadata::for_file(file, "kAFQmDzST7DWlj99KOF/cg==".to_string())
    }

    fn blob_response(storage_url: &str) -> String {
        serde_json::json!({
            "id": 1,
            "key": "k1",
            "filename": "a.png",
            "content_type": "image/png",
            "byte_size": 3,
            "checksum": "kAFQmDzST7DWlj99KOF/cg==",
            "signed_id": "signed-a",
            "direct_upload": {
                "url": storage_url,
                "headers": { "Content-Type": "image/png", "Content-MD5": "kAFQmDzST7DWlj99KOF/cg==" }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn create_direct_upload_posts_blob_with_csrf() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rails/active_storage/direct_uploads")
            .match_header("x-csrf-token", "csrf-123")
            .match_header("cookie", "_listing_session=abc")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "blob": { "filename": "a.png", "content_type": "image/png", "byte_size": 3 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(blob_response("https://storage.example.com/k1"))
            .create_async()
            .await;

        let client = ApiClient::new(
            server.url(),
            Auth::Session {
                csrf_token: "csrf-123".to_string(),
                cookie: Some("_listing_session=abc".to_string()),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let created = client
            .create_direct_upload("/rails/active_storage/direct_uploads", &blob_for(&file))
            .await
            .unwrap();

        assert_eq!(created.signed_id, "signed-a");
        assert_eq!(created.direct_upload.url, "https://storage.example.com/k1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_direct_upload_maps_rejection_to_authorization_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rails/active_storage/direct_uploads")
            .with_status(422)
            .with_body(r#"{"error":"invalid"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Auth::None, Duration::from_secs(5)).unwrap();
        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let err = client
            .create_direct_upload("/rails/active_storage/direct_uploads", &blob_for(&file))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Authorization {
                status: Some(422),
                ..
            }
        ));
        assert_eq!(
            err.client_message(),
            "Error creating Blob for \"a.png\". Status: 422"
        );
    }

    #[tokio::test]
    async fn create_direct_upload_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/uploads")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"filename":"a.png"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Auth::None, Duration::from_secs(5)).unwrap();
        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let err = client
            .create_direct_upload("/uploads", &blob_for(&file))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn upload_to_storage_puts_body_with_target_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/bucket/k1")
            .match_header("content-type", "image/png")
            .match_header("content-md5", "kAFQmDzST7DWlj99KOF/cg==")
            .match_header("content-length", "3")
            .match_body("abc")
            .with_status(200)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Auth::None, Duration::from_secs(5)).unwrap();
        let target = DirectUploadTarget {
            url: format!("{}/bucket/k1", server.url()),
            headers: [
                ("Content-Type".to_string(), "image/png".to_string()),
                (
                    "Content-MD5".to_string(),
                    "kAFQmDzST7DWlj99KOF/cg==".to_string(),
                ),
            ]
            .into_iter()
            .collect(),
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer_seen = seen.clone();
        let observer = Arc::new(move |sent: u64, total: u64| {
            observer_seen.lock().unwrap().push((sent, total));
        });

        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        client
            .upload_to_storage(&target, &file, observer)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(seen.lock().unwrap().last(), Some(&(3, 3)));
    }

    #[tokio::test]
    async fn upload_to_storage_maps_rejection_to_storage_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/bucket/k1")
            .with_status(403)
            .with_body("SignatureDoesNotMatch")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Auth::None, Duration::from_secs(5)).unwrap();
        let target = DirectUploadTarget {
            url: "/bucket/k1".to_string(),
            headers: Default::default(),
        };
        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let err = client
            .upload_to_storage(&target, &file, Arc::new(|_: u64, _: u64| {}))
            .await
            .unwrap_err();

        assert_eq!(err.client_message(), "Error storing \"a.png\". Status: 403");
    }

    #[tokio::test]
    async fn create_direct_upload_timeout_is_network_error() {
        // Accepts connections into the backlog but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let client = ApiClient::new(base_url, Auth::None, Duration::from_millis(200)).unwrap();
        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let err = client
            .create_direct_upload("/rails/active_storage/direct_uploads", &blob_for(&file))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Network(_)));
        assert_eq!(err.error_code(), "NETWORK_ERROR");
        assert_eq!(err.client_message(), "Request for \"a.png\" timed out");
        drop(listener);
    }

    #[tokio::test]
    async fn upload_to_storage_refused_connection_is_storage_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(
            "http://localhost".to_string(),
            Auth::None,
            Duration::from_secs(5),
        )
        .unwrap();
        let target = DirectUploadTarget {
            url: format!("http://{}/bucket/k1", addr),
            headers: Default::default(),
        };
        let file = SelectedFile::from_bytes("a.png", "image/png", b"abc".to_vec());
        let err = client
            .upload_to_storage(&target, &file, Arc::new(|_: u64, _: u64| {}))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Storage { status: None, .. }));
    }

    #[tokio::test]
    async fn progress_stream_reports_cumulative_bytes() {
        let data = vec![7u8; UPLOAD_CHUNK_SIZE * 2 + 10];
        let file = SelectedFile::from_bytes("big.png", "image/png", data);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer_seen = seen.clone();

        let stream = progress_stream(
            body_stream(&file).await.unwrap(),
            file.size,
            Arc::new(move |sent: u64, _total: u64| observer_seen.lock().unwrap().push(sent)),
        );
        let chunks: Vec<_> = stream.collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                UPLOAD_CHUNK_SIZE as u64,
                (UPLOAD_CHUNK_SIZE * 2) as u64,
                file.size
            ]
        );
    }
}
