//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with mock collaborators behind the job runner, so the intake surface can
//! be exercised without ffmpeg or network.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use soundshift_core::testing::MockCollaborators;
use soundshift_core::{
    Config, DomainAllowList, JobQueue, MemoryQueue, StagingArea, WorkerPool,
};
use soundshift_server::state::AppState;

/// Re-export fixtures for test convenience
pub use soundshift_core::testing::fixtures;

/// Test fixture with a mock-backed runner and an in-memory queue.
///
/// The worker pool is not started unless the fixture is built with
/// [`TestConfig::start_workers`], so queued jobs stay inspectable.
pub struct TestFixture {
    pub router: Router,
    pub mocks: MockCollaborators,
    pub queue: Arc<MemoryQueue>,
    pub pool: Arc<WorkerPool>,
    /// Staging directory shared by every job
    pub temp_dir: TempDir,
}

/// Knobs for [`TestFixture::with_config`].
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub valid_domains: Vec<String>,
    pub start_workers: bool,
    pub max_attempts: u32,
    /// Worker pool size, also the direct-stream conversion limit.
    pub concurrency: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            valid_domains: vec!["*".to_string()],
            start_workers: false,
            max_attempts: 3,
            concurrency: 2,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
    /// Body parsed as JSON, `Null` when it is not JSON.
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let staging = StagingArea::new(temp_dir.path());

        let mut config = Config::default();
        config.queue.max_attempts = test_config.max_attempts;
        config.worker.concurrency = test_config.concurrency;
        config.urls.valid_domains = test_config.valid_domains.clone();
        config.converter.temp_dir = temp_dir.path().to_path_buf();

        let allow_list =
            DomainAllowList::new(&test_config.valid_domains).expect("Invalid domain patterns");

        let mocks = MockCollaborators::new();
        let runner = Arc::new(mocks.runner(staging));
        let queue = Arc::new(MemoryQueue::new(test_config.max_attempts));
        let pool = Arc::new(WorkerPool::new(
            test_config.concurrency,
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            Arc::clone(&runner),
        ));
        if test_config.start_workers {
            pool.start().await;
        }

        let state = Arc::new(AppState::new(
            config,
            allow_list,
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            runner,
            Arc::clone(&pool),
        ));

        let router = soundshift_server::api::create_router(state);

        Self {
            router,
            mocks,
            queue,
            pool,
            temp_dir,
        }
    }

    /// Number of files left in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path())
            .expect("Failed to list temp dir")
            .count()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, &body.to_string()).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Direct-stream submission body (no output or notify URL).
pub fn direct_request_json() -> Value {
    let mut body = fixtures::push_request_json();
    let fields = body.as_object_mut().unwrap();
    fields.remove("output_url");
    fields.remove("notify_url");
    body
}

/// Polls `check` until it returns true or the deadline passes.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}
