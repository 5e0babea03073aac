//! Integration tests for `Fetcher::fetch` against a local `wiremock` server.

use std::time::Duration;

use assetsync_core::PipelineConfig;
use assetsync_pipeline::{AssetError, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(timeout_secs: u64, max_retries: u32) -> Fetcher {
    Fetcher::new(&PipelineConfig {
        fetch_timeout_secs: timeout_secs,
        fetch_max_retries: max_retries,
        retry_backoff_base_ms: 0,
        user_agent: "assetsync-test/0.1".to_string(),
        ..PipelineConfig::default()
    })
    .expect("failed to build test Fetcher")
}

#[tokio::test]
async fn returns_body_and_normalized_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "Image/PNG; charset=binary")
                .set_body_bytes(b"png-bytes".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let asset = fetcher(5, 0)
        .fetch(&format!("{}/a.png", server.uri()))
        .await
        .unwrap();

    assert_eq!(asset.bytes.as_ref(), b"png-bytes");
    assert_eq!(asset.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn follows_redirects_and_reports_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old.png"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/new.png", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"moved".to_vec()))
        .mount(&server)
        .await;

    let asset = fetcher(5, 0)
        .fetch(&format!("{}/old.png", server.uri()))
        .await
        .unwrap();

    assert_eq!(asset.bytes.as_ref(), b"moved");
    assert!(asset.url.ends_with("/new.png"), "final url {}", asset.url);
}

#[tokio::test]
async fn not_found_is_terminal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(5, 3)
        .fetch(&format!("{}/gone.png", server.uri()))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AssetError::Fetch { status: 404, .. }),
        "expected Fetch 404, got: {err:?}"
    );
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetcher(5, 2)
        .fetch(&format!("{}/flaky.png", server.uri()))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AssetError::Fetch { status: 503, .. }),
        "expected Fetch 503, got: {err:?}"
    );
}

#[tokio::test]
async fn retry_recovers_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let asset = fetcher(5, 1)
        .fetch(&format!("{}/a.png", server.uri()))
        .await
        .unwrap();
    assert_eq!(asset.bytes.as_ref(), b"ok");
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = fetcher(1, 0)
        .fetch(&format!("{}/slow.png", server.uri()))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AssetError::Timeout { timeout_secs: 1, .. }),
        "expected Timeout, got: {err:?}"
    );
}

#[tokio::test]
async fn refused_connection_maps_to_transport() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = fetcher(5, 0)
        .fetch(&format!("http://127.0.0.1:{port}/a.png"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AssetError::Transport { .. }),
        "expected Transport, got: {err:?}"
    );
}
