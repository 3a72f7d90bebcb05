//! Conversion submission handlers.
//!
//! `POST /v1/convert-and-create` queues a push-mode job and answers with its
//! id. `POST /v1/convert` and `GET /v1/convert?encodedParams=` run a
//! direct-stream conversion inside the request and stream the produced file
//! back as the response body.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use soundshift_core::{
    validate_request, ConversionRequest, DirectOutput, IntakeMode, Job, JobError,
    RawConversionRequest, StagedFile, ValidationError,
};

use super::error::ApiError;
use crate::metrics::SUBMISSIONS_TOTAL;
use crate::state::AppState;

/// Response for an accepted push-mode submission
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: String,
}

/// Query string of the GET direct-stream variant
#[derive(Debug, Deserialize)]
pub struct EncodedParams {
    /// Base64 encoded JSON submission
    #[serde(rename = "encodedParams")]
    pub encoded_params: String,
}

/// Queue a push-mode conversion
pub async fn convert_and_create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawConversionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let request = intake(&state, payload.map(|Json(raw)| raw)?, IntakeMode::Push)?;
    let job = state.queue().enqueue(request).await?;

    info!(job_id = %job.id, "Accepted conversion job");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            id: job.id,
        }),
    ))
}

/// Direct-stream conversion with a JSON body
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawConversionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = intake(&state, payload.map(|Json(raw)| raw)?, IntakeMode::Direct)?;
    run_direct(&state, request).await
}

/// Direct-stream conversion with base64 encoded query parameters
pub async fn convert_encoded(
    State(state): State<Arc<AppState>>,
    params: Result<Query<EncodedParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let raw = decode_params(&params.encoded_params)?;
    let request = intake(&state, raw, IntakeMode::Direct)?;
    run_direct(&state, request).await
}

fn intake(
    state: &AppState,
    raw: RawConversionRequest,
    mode: IntakeMode,
) -> Result<ConversionRequest, ApiError> {
    let label = match mode {
        IntakeMode::Push => "push",
        IntakeMode::Direct => "direct",
    };
    match validate_request(raw, state.allow_list(), mode) {
        Ok(request) => {
            SUBMISSIONS_TOTAL.with_label_values(&[label, "accepted"]).inc();
            Ok(request)
        }
        Err(e) => {
            info!(mode = label, error = %e, "Rejected conversion request");
            SUBMISSIONS_TOTAL.with_label_values(&[label, "rejected"]).inc();
            Err(e.into())
        }
    }
}

/// Decodes the `encodedParams` value into a raw submission.
///
/// Standard and URL-safe alphabets are both accepted.
pub fn decode_params(encoded: &str) -> Result<RawConversionRequest, ValidationError> {
    let encoded = encoded.trim();
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| general_purpose::URL_SAFE.decode(encoded))
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(encoded))
        .map_err(|e| ValidationError::Malformed(format!("encodedParams: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::Malformed(format!("encodedParams: {}", e)))
}

async fn run_direct(state: &AppState, request: ConversionRequest) -> Result<Response, ApiError> {
    // Direct conversions are never redelivered.
    let mut job = Job::new(request, 1);
    job.attempt = 1;

    // Shares the worker concurrency limit. The permit lives in the attempt
    // task so it is held until conversion ends, even if the client leaves.
    let permit = Arc::clone(state.direct_slots())
        .acquire_owned()
        .await
        .map_err(|_| ApiError::Internal("direct conversion slots closed".to_string()))?;

    let handle = {
        let runner = Arc::clone(state.runner());
        let job = job.clone();
        tokio::spawn(async move {
            let _permit = permit;
            runner.run_direct(&job).await
        })
    };

    let output = match handle.await {
        Ok(result) => result?,
        Err(join_err) => {
            error!(job_id = %job.id, error = %join_err, "Direct job task panicked");
            let err = JobError::internal(format!("job task failed: {}", join_err));
            state.runner().notify_failure(&job, &err).await;
            return Err(err.into());
        }
    };

    let DirectOutput {
        file,
        stream,
        file_name,
        content_type,
        size,
        ..
    } = output;

    let body = Body::from_stream(StagedFileStream {
        stream,
        _file: file,
    });

    info!(job_id = %job.id, file_name = %file_name, size, "Streaming converted file");
    Response::builder()
        .status(StatusCode::CREATED)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Response body that owns the staged output; the file is removed when the
/// body is dropped, whether or not it was read to the end.
struct StagedFileStream {
    stream: ReaderStream<File>,
    _file: StagedFile,
}

impl Stream for StagedFileStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}
