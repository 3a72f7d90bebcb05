//! Intake API tests driving the router in-process with mock collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::json;

use common::{direct_request_json, fixtures, wait_until, TestConfig, TestFixture};
use soundshift_core::{FetchError, JobQueue, JobStatus};

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["workers"]["running"], false);
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["queue"]["max_attempts"], 3);
    assert_eq!(response.body["urls"]["valid_domains"], json!(["*"]));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let fixture = TestFixture::new().await;
    fixture.get("/health").await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = String::from_utf8(response.bytes.to_vec()).unwrap();
    assert!(text.contains("soundshift_http_requests_total"));
    assert!(text.contains("soundshift_worker_pool_running"));
}

// =============================================================================
// Push mode
// =============================================================================

#[tokio::test]
async fn test_convert_and_create_queues_job() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/v1/convert-and-create", fixtures::push_request_json())
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    let id = response.body["id"].as_str().unwrap().to_string();
    assert_eq!(fixture.queue.pending().await, 1);

    let record = fixture.get(&format!("/v1/jobs/{}", id)).await;
    assert_eq!(record.status, StatusCode::OK);
    assert_eq!(record.body["id"], id.as_str());
    assert_eq!(record.body["status"], "queued");
    assert_eq!(record.body["attempts"], 0);
}

#[tokio::test]
async fn test_mp3_with_wrong_bit_rate_is_never_enqueued() {
    let fixture = TestFixture::new().await;
    let mut body = fixtures::push_request_json();
    body["output_format"] = json!("mp3");
    body["output_bit_depth"] = json!(null);
    body["output_bit_rate"] = json!("256");

    let response = fixture.post("/v1/convert-and-create", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["message"], "Output bit rate is not valid");
    assert_eq!(fixture.queue.pending().await, 0);
}

#[tokio::test]
async fn test_missing_dither_is_rejected() {
    let fixture = TestFixture::new().await;
    let mut body = fixtures::push_request_json();
    body.as_object_mut().unwrap().remove("output_dither");

    let response = fixture.post("/v1/convert-and-create", body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Output dither is not valid");
    assert_eq!(fixture.queue.pending().await, 0);
}

#[tokio::test]
async fn test_push_requires_output_url() {
    let fixture = TestFixture::new().await;
    let mut body = fixtures::push_request_json();
    body.as_object_mut().unwrap().remove("output_url");

    let response = fixture.post("/v1/convert-and-create", body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Output URL is not valid");
}

#[tokio::test]
async fn test_disallowed_domain_is_rejected() {
    let fixture = TestFixture::with_config(TestConfig {
        valid_domains: vec!["*.source.test".to_string(), "dest.test".to_string()],
        ..Default::default()
    })
    .await;

    let response = fixture
        .post("/v1/convert-and-create", fixtures::push_request_json())
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Input URL is not valid");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post_raw("/v1/convert-and-create", "{not json")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed request body"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .get("/v1/jobs/550e8400-e29b-41d4-a716-446655440000")
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_queued_job_is_processed_by_workers() {
    let fixture = TestFixture::with_config(TestConfig {
        start_workers: true,
        ..Default::default()
    })
    .await;

    let response = fixture
        .post("/v1/convert-and-create", fixtures::push_request_json())
        .await;
    let id = response.body["id"].as_str().unwrap().to_string();

    let queue = fixture.queue.clone();
    let completed = wait_until(|| {
        let queue = queue.clone();
        let id = id.clone();
        async move {
            matches!(
                queue.get(&id).await.map(|r| r.status),
                Some(JobStatus::Completed)
            )
        }
    })
    .await;
    assert!(completed, "job did not complete");

    let uploads = fixture.mocks.publisher.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].url, "https://dest.test/out.flac");
    assert_eq!(uploads[0].body, fixtures::OUTPUT_BYTES);

    let notifications = fixture.mocks.notifier.notifications_for(&id).await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].url, "https://hooks.test/done");
    assert!(notifications[0].payload.is_success());
    assert_eq!(notifications[0].payload.context["objectId"], "abc");

    fixture.pool.stop().await;
    assert_eq!(fixture.staged_files(), 0);
}

// =============================================================================
// Direct-stream mode
// =============================================================================

#[tokio::test]
async fn test_direct_convert_streams_file() {
    let fixture = TestFixture::new().await;
    let response = fixture.post("/v1/convert", direct_request_json()).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.headers[header::CONTENT_TYPE], "audio/flac");
    assert_eq!(
        response.headers[header::CONTENT_LENGTH],
        fixtures::OUTPUT_BYTES.len().to_string().as_str()
    );
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"take-1-48000-24.flac\""
    );
    assert_eq!(&response.bytes[..], fixtures::OUTPUT_BYTES);

    // Body fully consumed and dropped
    assert_eq!(fixture.staged_files(), 0);
    assert_eq!(fixture.mocks.publisher.upload_count().await, 0);
    assert_eq!(fixture.mocks.notifier.notification_count().await, 0);
}

#[tokio::test]
async fn test_direct_convert_rejects_output_url() {
    let fixture = TestFixture::new().await;
    let mut body = direct_request_json();
    body["output_url"] = json!("https://dest.test/out.flac");

    let response = fixture.post("/v1/convert", body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.mocks.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_direct_convert_failure_is_500() {
    let fixture = TestFixture::new().await;
    fixture
        .mocks
        .fetcher
        .set_next_error(FetchError::Status { status: 404 })
        .await;

    let response = fixture.post("/v1/convert", direct_request_json()).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["success"], false);
    assert!(response.body["message"].is_string());
    assert_eq!(fixture.staged_files(), 0);
}

#[tokio::test]
async fn test_direct_convert_notifies_when_asked() {
    let fixture = TestFixture::new().await;
    let mut body = direct_request_json();
    body["notify_url"] = json!("https://hooks.test/direct");

    let response = fixture.post("/v1/convert", body).await;
    assert_eq!(response.status, StatusCode::CREATED);

    let notifications = fixture.mocks.notifier.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].url, "https://hooks.test/direct");
    assert!(notifications[0].payload.is_success());
}

#[tokio::test]
async fn test_encoded_get_variant() {
    let fixture = TestFixture::new().await;
    let encoded = URL_SAFE_NO_PAD.encode(direct_request_json().to_string());

    let response = fixture
        .get(&format!("/v1/convert?encodedParams={}", encoded))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.headers[header::CONTENT_TYPE], "audio/flac");
    assert_eq!(&response.bytes[..], fixtures::OUTPUT_BYTES);
}

#[tokio::test]
async fn test_encoded_get_requires_params() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/v1/convert").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = fixture.get("/v1/convert?encodedParams=%25%25").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_direct_convert_panic_is_500_with_one_notification() {
    let fixture = TestFixture::new().await;
    fixture.mocks.transcoder.set_panic_next();
    let mut body = direct_request_json();
    body["notify_url"] = json!("https://hooks.test/direct");

    let response = fixture.post("/v1/convert", body).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["success"], false);

    let notifications = fixture.mocks.notifier.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].payload.is_success());
    assert_eq!(fixture.staged_files(), 0);

    // The service keeps converting after the panic.
    let response = fixture.post("/v1/convert", direct_request_json()).await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_direct_conversions_respect_worker_concurrency() {
    let fixture = TestFixture::with_config(TestConfig {
        concurrency: 1,
        ..Default::default()
    })
    .await;
    let gate = fixture.mocks.transcoder.hold_runs().await;
    let transcoder = Arc::clone(&fixture.mocks.transcoder);

    let release = async move {
        let runs_reach = |n: usize| {
            let transcoder = Arc::clone(&transcoder);
            move || {
                let transcoder = Arc::clone(&transcoder);
                async move { transcoder.run_count().await == n }
            }
        };

        assert!(wait_until(runs_reach(1)).await, "first conversion never started");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            transcoder.run_count().await,
            1,
            "second conversion started while the only slot was taken"
        );

        gate.add_permits(1);
        assert!(wait_until(runs_reach(2)).await, "second conversion never started");
        gate.add_permits(1);
    };

    let (first, second, ()) = tokio::join!(
        fixture.post("/v1/convert", direct_request_json()),
        fixture.post("/v1/convert", direct_request_json()),
        release,
    );

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(&first.bytes[..], fixtures::OUTPUT_BYTES);
    assert_eq!(&second.bytes[..], fixtures::OUTPUT_BYTES);
}
