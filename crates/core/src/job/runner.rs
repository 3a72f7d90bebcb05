//! Job orchestrator implementation.
//!
//! Sequences the stages of one job attempt:
//! fetch -> probe input -> transcode -> probe output -> publish -> notify.
//! Staging files are released on every exit path, and a job produces at most
//! one notification over all of its attempts.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::inspector::{check_media, MediaMetadata, MediaProber};
use crate::metrics::{JOBS_TOTAL, JOB_FAILURES, NOTIFICATIONS, STAGE_DURATION, TRANSFER_BYTES};
use crate::notifier::{NotificationPayload, Notifier};
use crate::queue::Job;
use crate::staging::{StagedFile, StagingArea, StagingPair};
use crate::transcoder::{build_args, output_file_name, Transcoder};
use crate::transfer::{open_file_stream, Fetcher, Publisher};

use super::error::{JobError, MediaSide};
use super::types::{DirectOutput, JobState, JobUpdateCallback};

/// Converted output still on disk, with the metadata of the output pass.
struct Produced {
    output: StagedFile,
    metadata: MediaMetadata,
}

/// Runs conversion jobs against injected collaborators.
pub struct JobRunner {
    staging: StagingArea,
    fetcher: Arc<dyn Fetcher>,
    prober: Arc<dyn MediaProber>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    on_update: Option<JobUpdateCallback>,
}

impl JobRunner {
    pub fn new(
        staging: StagingArea,
        fetcher: Arc<dyn Fetcher>,
        prober: Arc<dyn MediaProber>,
        transcoder: Arc<dyn Transcoder>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            staging,
            fetcher,
            prober,
            transcoder,
            publisher,
            notifier,
            on_update: None,
        }
    }

    /// Registers a callback invoked on every state transition.
    pub fn with_update_callback(mut self, callback: JobUpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Whether a failed attempt will be redelivered instead of reported.
    pub fn will_retry(job: &Job, err: &JobError) -> bool {
        err.is_retryable() && !job.is_final_attempt()
    }

    /// Runs one push-mode attempt: the output is uploaded to `output_url`.
    ///
    /// On success the notification is sent before returning. On failure it
    /// is sent only when the attempt will not be retried.
    pub async fn run(&self, job: &Job) -> Result<MediaMetadata, JobError> {
        info!(job_id = %job.id, attempt = job.attempt, "Starting job");

        match self.execute_push(job).await {
            Ok(metadata) => {
                self.complete(job, "push", &metadata).await;
                Ok(metadata)
            }
            Err(err) => {
                self.fail(job, "push", &err).await;
                Err(err)
            }
        }
    }

    /// Runs a direct-stream attempt and hands the converted file back.
    ///
    /// A notification is sent only when the request carries a `notify_url`.
    pub async fn run_direct(&self, job: &Job) -> Result<DirectOutput, JobError> {
        info!(job_id = %job.id, "Starting direct job");

        match self.execute_direct(job).await {
            Ok(output) => {
                self.complete(job, "direct", &output.metadata).await;
                Ok(output)
            }
            Err(err) => {
                self.fail(job, "direct", &err).await;
                Err(err)
            }
        }
    }

    /// Sends the failure notification for a job that will not run again.
    ///
    /// Used by the worker pool when a job ends outside [`run`](Self::run),
    /// e.g. after a panic or when the queue refuses a redelivery.
    pub async fn notify_failure(&self, job: &Job, err: &JobError) {
        let payload =
            NotificationPayload::failure(&job.id, job.request.context.clone(), err.to_serialized());
        self.send_notification(job, &payload).await;
    }

    async fn execute_push(&self, job: &Job) -> Result<MediaMetadata, JobError> {
        let output_url = job
            .request
            .output_url()
            .ok_or_else(|| JobError::internal("push job without output_url"))?;

        let produced = self.produce(job).await?;

        let published = self
            .stage(job, JobState::Publishing, async {
                Ok::<_, JobError>(self.publisher.publish(produced.output.path(), output_url).await?)
            })
            .await;
        release(produced.output);

        let bytes = published?;
        TRANSFER_BYTES.with_label_values(&["publish"]).inc_by(bytes);
        Ok(produced.metadata)
    }

    async fn execute_direct(&self, job: &Job) -> Result<DirectOutput, JobError> {
        let produced = self.produce(job).await?;

        // Publishing opens the file for the caller; success is only reported
        // once the stream exists.
        let opened = self
            .stage(job, JobState::Publishing, async {
                open_file_stream(produced.output.path())
                    .await
                    .map_err(|e| JobError::internal(format!("failed to open output: {}", e)))
            })
            .await;

        let (size, stream) = match opened {
            Ok(opened) => opened,
            Err(err) => {
                release(produced.output);
                return Err(err);
            }
        };

        Ok(DirectOutput {
            file: produced.output,
            stream,
            metadata: produced.metadata,
            file_name: output_file_name(&job.request),
            content_type: job.request.output_format.content_type(),
            size,
        })
    }

    /// Fetch, validate, transcode and validate again.
    ///
    /// The input file is released before returning; the output file is
    /// returned on success and released on failure.
    async fn produce(&self, job: &Job) -> Result<Produced, JobError> {
        let request = &job.request;
        let pair = self.staging.acquire_pair(
            request.input_format.extension(),
            request.output_format.extension(),
        )?;

        match self.convert(job, &pair).await {
            Ok(metadata) => {
                let StagingPair { input, output } = pair;
                release(input);
                Ok(Produced { output, metadata })
            }
            Err(err) => {
                if let Err(e) = pair.release() {
                    warn!(job_id = %job.id, error = %e, "Failed to release staging files");
                }
                Err(err)
            }
        }
    }

    async fn convert(&self, job: &Job, pair: &StagingPair) -> Result<MediaMetadata, JobError> {
        let request = &job.request;
        let input = pair.input.path();
        let output = pair.output.path();

        let bytes = self
            .stage(job, JobState::Fetching, async {
                Ok::<_, JobError>(self.fetcher.fetch(&request.input_url, input).await?)
            })
            .await?;
        TRANSFER_BYTES.with_label_values(&["fetch"]).inc_by(bytes);

        let source = self
            .stage(job, JobState::ProbingInput, self.inspect(input, MediaSide::Input))
            .await?;
        debug!(job_id = %job.id, meta = ?source, "Input accepted");

        self.stage(job, JobState::Transcoding, async {
            let args = build_args(request, Some(source.sample_rate), input, output);
            self.transcoder.run(&args).await?;
            Ok::<_, JobError>(())
        })
        .await?;

        let produced = self
            .stage(job, JobState::ProbingOutput, self.inspect(output, MediaSide::Output))
            .await?;
        debug!(job_id = %job.id, meta = ?produced, "Output accepted");

        Ok(produced)
    }

    async fn inspect(
        &self,
        path: &std::path::Path,
        side: MediaSide,
    ) -> Result<MediaMetadata, JobError> {
        let meta = self
            .prober
            .inspect(path)
            .await
            .map_err(|e| JobError::media(side, e))?;
        check_media(&meta).map_err(|e| JobError::media(side, e))?;
        Ok(meta)
    }

    /// Enters `state`, runs `work` and records its duration.
    async fn stage<T, F>(&self, job: &Job, state: JobState, work: F) -> Result<T, JobError>
    where
        F: Future<Output = Result<T, JobError>>,
    {
        let timer = STAGE_DURATION
            .with_label_values(&[state.name()])
            .start_timer();
        self.transition(job, &state);
        let result = work.await;
        timer.observe_duration();
        result
    }

    async fn complete(&self, job: &Job, mode: &str, metadata: &MediaMetadata) {
        self.transition(job, &JobState::Notifying);
        let payload =
            NotificationPayload::success(&job.id, job.request.context.clone(), metadata.clone());
        self.send_notification(job, &payload).await;

        self.transition(job, &JobState::Done);
        JOBS_TOTAL.with_label_values(&[mode, "success"]).inc();
        info!(job_id = %job.id, "Job completed");
    }

    async fn fail(&self, job: &Job, mode: &str, err: &JobError) {
        let will_retry = Self::will_retry(job, err);
        error!(
            job_id = %job.id,
            attempt = job.attempt,
            kind = err.kind(),
            error = %err,
            will_retry,
            "Job failed"
        );
        JOB_FAILURES.with_label_values(&[err.kind()]).inc();
        JOBS_TOTAL.with_label_values(&[mode, "failed"]).inc();

        self.transition(
            job,
            &JobState::Failed {
                reason: err.to_string(),
            },
        );

        if !will_retry {
            self.notify_failure(job, err).await;
        }
    }

    /// Delivers `payload` if the request has a `notify_url`. Errors are logged only.
    async fn send_notification(&self, job: &Job, payload: &NotificationPayload) {
        let Some(url) = job.request.notify_url.as_deref() else {
            debug!(job_id = %job.id, "No notify_url, skipping notification");
            return;
        };

        match self.notifier.notify(url, payload).await {
            Ok(()) => {
                NOTIFICATIONS.with_label_values(&["delivered"]).inc();
                info!(job_id = %job.id, success = payload.is_success(), "Notification sent");
            }
            Err(e) => {
                NOTIFICATIONS.with_label_values(&["failed"]).inc();
                warn!(job_id = %job.id, url = %url, error = %e, "Failed to deliver notification");
            }
        }
    }

    fn transition(&self, job: &Job, state: &JobState) {
        debug!(job_id = %job.id, state = %state, "Job state changed");
        if let Some(callback) = &self.on_update {
            callback(&job.id, state);
        }
    }
}

fn release(file: StagedFile) {
    if let Err(e) = file.release() {
        warn!(error = %e, "Failed to release staging file");
    }
}
