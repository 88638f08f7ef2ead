//! HTTP multipart uploader against a mocked endpoint.

use assert_matches::assert_matches;
use ecosphere_sync::{CloudinaryUploader, SyncError, Uploader};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn upload_returns_secure_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/image/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"secure_url": "https://cdn.example/photo.jpg"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uploader =
        CloudinaryUploader::with_endpoint(format!("{}/image/upload", server.uri()), "ecosphere");
    let url = uploader
        .upload(vec![0xFF, 0xD8, 0xFF], "image/jpeg")
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.example/photo.jpg");
}

#[tokio::test]
async fn server_error_surfaces_as_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let uploader =
        CloudinaryUploader::with_endpoint(format!("{}/image/upload", server.uri()), "ecosphere");
    let error = uploader
        .upload(vec![0x01], "image/jpeg")
        .await
        .unwrap_err();
    assert_matches!(error, SyncError::Upload { .. });
}

#[tokio::test]
async fn missing_secure_url_is_an_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let uploader =
        CloudinaryUploader::with_endpoint(format!("{}/image/upload", server.uri()), "ecosphere");
    let error = uploader
        .upload(vec![0x01], "image/jpeg")
        .await
        .unwrap_err();
    assert_matches!(error, SyncError::Upload { .. });
}
