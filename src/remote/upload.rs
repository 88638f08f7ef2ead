//! Image Upload Seam
//!
//! Posts created with a photo carry the raw bytes in the write queue and
//! only acquire a URL at commit time, by handing the blob to an upload
//! endpoint. The endpoint is a single-attempt multipart POST with no
//! built-in retry; a failed upload leaves the whole post queued, since a
//! post is never committed without its image.

use reqwest::multipart::{Form, Part};
use std::future::Future;

use crate::shared::error::SyncError;

/// Accepts an image blob and returns the URL it is served from.
pub trait Uploader: Send + Sync + 'static {
    /// Upload `bytes` with the given content type, single attempt
    fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;
}

/// Unsigned upload endpoint of a Cloudinary-style media host.
///
/// Sends the blob as a multipart form with an `upload_preset` field and
/// reads the serving URL from the `secure_url` member of the JSON
/// response.
#[derive(Debug, Clone)]
pub struct CloudinaryUploader {
    endpoint: String,
    upload_preset: String,
    client: reqwest::Client,
}

impl CloudinaryUploader {
    /// Point at a named cloud's image upload endpoint
    pub fn new(cloud_name: &str, upload_preset: impl Into<String>) -> Self {
        Self::with_endpoint(
            format!("https://api.cloudinary.com/v1_1/{}/image/upload", cloud_name),
            upload_preset,
        )
    }

    /// Point at an explicit endpoint URL (used by tests)
    pub fn with_endpoint(endpoint: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            upload_preset: upload_preset.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Uploader for CloudinaryUploader {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, SyncError> {
        let part = Part::bytes(bytes)
            .file_name("image.jpg")
            .mime_str(content_type)
            .map_err(|err| SyncError::upload(format!("invalid content type: {}", err)))?;
        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| SyncError::upload(format!("request failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(SyncError::upload(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| SyncError::upload(format!("invalid response body: {}", err)))?;

        body.get("secure_url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| SyncError::upload("response has no secure_url"))
    }
}
