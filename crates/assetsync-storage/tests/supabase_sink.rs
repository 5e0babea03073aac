//! Integration tests for `SupabaseStorageSink` against a `wiremock` server.

use assetsync_pipeline::{BlobSink, CollaboratorError};
use assetsync_storage::SupabaseStorageSink;
use bytes::Bytes;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sink(server: &MockServer) -> SupabaseStorageSink {
    SupabaseStorageSink::new(&server.uri(), "service-key", "product-images", 5, "assetsync-test/0.1")
        .expect("failed to build test sink")
}

#[tokio::test]
async fn upload_posts_with_upsert_and_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/product-images/widget-1-42.jpg"))
        .and(header("authorization", "Bearer service-key"))
        .and(header("apikey", "service-key"))
        .and(header("x-upsert", "true"))
        .and(header("content-type", "image/jpeg"))
        .and(body_bytes(b"jpeg-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Key":"product-images/widget-1-42.jpg"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let url = sink(&server)
        .upload("widget-1-42.jpg", Bytes::from_static(b"jpeg-bytes"), "image/jpeg")
        .await
        .unwrap();

    assert_eq!(
        url,
        format!(
            "{}/storage/v1/object/public/product-images/widget-1-42.jpg",
            server.uri()
        )
    );
}

#[tokio::test]
async fn non_success_status_is_a_rejection_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("Payload too large"))
        .mount(&server)
        .await;

    let err = sink(&server)
        .upload("big.jpg", Bytes::from_static(b"x"), "image/jpeg")
        .await
        .unwrap_err();

    match err {
        CollaboratorError::Rejected {
            status, message, ..
        } => {
            assert_eq!(status, 413);
            assert_eq!(message, "Payload too large");
        }
        other => panic!("expected Rejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = sink(&server)
        .upload("a.jpg", Bytes::from_static(b"x"), "image/jpeg")
        .await
        .unwrap_err();
    assert!(err.is_transient(), "502 should be retriable: {err:?}");
}
