pub mod config;
pub mod inspector;
pub mod job;
pub mod metrics;
pub mod notifier;
pub mod queue;
pub mod request;
pub mod staging;
pub mod testing;
pub mod transcoder;
pub mod transfer;
pub mod worker;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use inspector::{FfprobeInspector, InspectError, MediaMetadata, MediaProber};
pub use job::{DirectOutput, JobError, JobRunner, JobState, JobUpdateCallback};
pub use notifier::{NotificationPayload, Notifier, NotifyError, SerializedError, WebhookNotifier};
pub use queue::{
    Job, JobQueue, JobRecord, JobStatus, MemoryQueue, QueueError, RecordRetention, Redelivery,
};
pub use request::{
    validate_request, AudioFormat, ConversionRequest, DomainAllowList, IntakeMode,
    RawConversionRequest, ValidationError,
};
pub use staging::{StagedFile, StagingArea, StagingError};
pub use transcoder::{ConverterConfig, FfmpegTranscoder, TranscodeError, Transcoder};
pub use transfer::{FetchError, Fetcher, HttpTransfer, PublishError, Publisher};
pub use worker::{WorkerPool, WorkerPoolStatus};
