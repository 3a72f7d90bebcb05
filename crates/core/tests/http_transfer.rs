//! HTTP transfer and webhook tests against an in-process axum server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tempfile::TempDir;
use tokio::sync::Mutex;

use soundshift_core::{
    config::HttpConfig,
    notifier::{NotificationPayload, Notifier, NotifyError, SerializedError, WebhookNotifier},
    testing::fixtures,
    transfer::{FetchError, Fetcher, HttpTransfer, PublishError, Publisher},
};

const SOURCE_LEN: usize = 300 * 1024;

#[derive(Default)]
struct Received {
    upload: Mutex<Option<Vec<u8>>>,
    hooks: Mutex<Vec<serde_json::Value>>,
}

async fn spawn_server() -> (SocketAddr, Arc<Received>) {
    let received = Arc::new(Received::default());

    let app = Router::new()
        .route("/source.wav", get(|| async { vec![42u8; SOURCE_LEN] }))
        .route("/missing.wav", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/upload",
            put(
                |State(state): State<Arc<Received>>, body: Bytes| async move {
                    *state.upload.lock().await = Some(body.to_vec());
                    StatusCode::CREATED
                },
            ),
        )
        .route("/forbidden", put(|| async { StatusCode::FORBIDDEN }))
        .route(
            "/hook",
            post(
                |State(state): State<Arc<Received>>, Json(body): Json<serde_json::Value>| async move {
                    state.hooks.lock().await.push(body);
                    StatusCode::OK
                },
            ),
        )
        .route("/hook-down", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route(
            "/stall",
            get(stall)
                .put(|_body: Bytes| stall())
                .post(|_body: Bytes| stall()),
        )
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, received)
}

/// Answers only after every client timeout in these tests has fired.
async fn stall() -> StatusCode {
    tokio::time::sleep(STALL).await;
    StatusCode::OK
}

const STALL: Duration = Duration::from_secs(5);

fn transfer() -> HttpTransfer {
    HttpTransfer::new(&HttpConfig::default()).unwrap()
}

fn impatient_transfer() -> HttpTransfer {
    HttpTransfer::new(&HttpConfig {
        read_timeout_secs: 1,
        ..HttpConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_streams_body_to_disk() {
    let (addr, _) = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("in.wav");

    let bytes = transfer()
        .fetch(&format!("http://{}/source.wav", addr), &dest)
        .await
        .unwrap();

    assert_eq!(bytes, SOURCE_LEN as u64);
    assert_eq!(std::fs::read(&dest).unwrap().len(), SOURCE_LEN);
}

#[tokio::test]
async fn test_fetch_non_2xx_is_status_error() {
    let (addr, _) = spawn_server().await;
    let temp = TempDir::new().unwrap();

    let err = transfer()
        .fetch(&format!("http://{}/missing.wav", addr), &temp.path().join("x.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404 }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let temp = TempDir::new().unwrap();
    let err = transfer()
        .fetch(&format!("http://{}/source.wav", addr), &temp.path().join("x.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_publish_puts_file() {
    let (addr, received) = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("out.flac");
    std::fs::write(&source, fixtures::OUTPUT_BYTES).unwrap();

    let bytes = transfer()
        .publish(&source, &format!("http://{}/upload", addr))
        .await
        .unwrap();

    assert_eq!(bytes, fixtures::OUTPUT_BYTES.len() as u64);
    let uploaded = received.upload.lock().await.clone().unwrap();
    assert_eq!(uploaded, fixtures::OUTPUT_BYTES);
}

#[tokio::test]
async fn test_publish_rejected_by_destination() {
    let (addr, _) = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("out.flac");
    std::fs::write(&source, b"x").unwrap();

    let err = transfer()
        .publish(&source, &format!("http://{}/forbidden", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Status { status: 403 }));
}

#[tokio::test]
async fn test_webhook_posts_payload() {
    let (addr, received) = spawn_server().await;
    let notifier = WebhookNotifier::new(Duration::from_secs(5)).unwrap();

    let payload = NotificationPayload::failure(
        "job-42",
        serde_json::json!({ "objectId": "abc" }),
        SerializedError::new("fetch", "Source responded with status 404"),
    );
    notifier
        .notify(&format!("http://{}/hook", addr), &payload)
        .await
        .unwrap();

    let hooks = received.hooks.lock().await;
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0]["id"], "job-42");
    assert_eq!(hooks[0]["context"]["objectId"], "abc");
    assert!(hooks[0]["meta"].is_null());
    assert_eq!(hooks[0]["err"]["kind"], "fetch");
}

#[tokio::test]
async fn test_webhook_error_status() {
    let (addr, _) = spawn_server().await;
    let notifier = WebhookNotifier::new(Duration::from_secs(5)).unwrap();
    let payload = NotificationPayload::success("job-1", serde_json::Value::Null, fixtures::flac_metadata());

    let err = notifier
        .notify(&format!("http://{}/hook-down", addr), &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Status { status: 503 }));
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test]
async fn test_fetch_stalled_source_times_out() {
    let (addr, _) = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let started = std::time::Instant::now();

    let err = impatient_transfer()
        .fetch(&format!("http://{}/stall", addr), &temp.path().join("in.wav"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout), "got {:?}", err);
    assert!(err.is_retryable());
    assert!(started.elapsed() < STALL);
}

#[tokio::test]
async fn test_publish_stalled_destination_times_out() {
    let (addr, _) = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("out.flac");
    std::fs::write(&source, fixtures::OUTPUT_BYTES).unwrap();

    let err = impatient_transfer()
        .publish(&source, &format!("http://{}/stall", addr))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Timeout), "got {:?}", err);
}

#[tokio::test]
async fn test_webhook_stalled_endpoint_times_out() {
    let (addr, _) = spawn_server().await;
    let notifier = WebhookNotifier::new(Duration::from_secs(1)).unwrap();
    let payload = NotificationPayload::success("job-1", serde_json::Value::Null, fixtures::flac_metadata());
    let started = std::time::Instant::now();

    let err = notifier
        .notify(&format!("http://{}/stall", addr), &payload)
        .await
        .unwrap_err();

    match err {
        NotifyError::Request(e) => assert!(e.is_timeout()),
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert!(started.elapsed() < STALL);
}
