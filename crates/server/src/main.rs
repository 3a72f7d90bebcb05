use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundshift_core::{
    load_config, load_config_from_env, validate_config, Config, DomainAllowList,
    FfmpegTranscoder, FfprobeInspector, HttpTransfer, JobQueue, JobRunner, JobState,
    MemoryQueue, RecordRetention, StagingArea, WebhookNotifier, WorkerPool,
};

use soundshift_server::api::create_router;
use soundshift_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = read_config()?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        concurrency = config.worker.concurrency,
        max_attempts = config.queue.max_attempts,
        temp_dir = %config.converter.temp_dir.display(),
        "Worker settings"
    );

    let allow_list = DomainAllowList::new(&config.urls.valid_domains)
        .map_err(anyhow::Error::msg)
        .context("Invalid urls.valid_domains")?;

    // Staging directory for fetched and converted files
    let staging = StagingArea::new(config.converter.temp_dir.clone());
    staging
        .prepare()
        .await
        .context("Failed to prepare staging directory")?;

    // External collaborators
    let transfer = Arc::new(HttpTransfer::new(&config.http).context("Failed to build HTTP client")?);
    let notifier = Arc::new(
        WebhookNotifier::new(Duration::from_secs(config.http.notify_timeout_secs))
            .context("Failed to build webhook client")?,
    );
    let prober = Arc::new(FfprobeInspector::new(config.converter.clone()));
    let transcoder = FfmpegTranscoder::new(config.converter.clone());

    if let Err(e) = soundshift_core::Transcoder::validate(&transcoder).await {
        // Jobs fail individually until ffmpeg is available.
        error!("Transcoder unavailable: {}", e);
    }

    let runner = JobRunner::new(
        staging,
        transfer.clone(),
        prober,
        Arc::new(transcoder),
        transfer,
        notifier,
    )
    .with_update_callback(Arc::new(|job_id: &str, state: &JobState| {
        if state.is_terminal() {
            info!(job_id, state = %state, "Job finished");
        }
    }));
    let runner = Arc::new(runner);

    // Queue and worker pool
    let queue: Arc<dyn JobQueue> = Arc::new(
        MemoryQueue::new(config.queue.max_attempts)
            .with_retention(RecordRetention::from(&config.queue)),
    );
    let pool = Arc::new(WorkerPool::new(
        config.worker.concurrency,
        Arc::clone(&queue),
        Arc::clone(&runner),
    ));
    pool.start().await;
    info!("Worker pool started");

    // Create app state
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        config,
        allow_list,
        queue,
        runner,
        Arc::clone(&pool),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    pool.stop().await;
    info!("Worker pool stopped");

    Ok(())
}

/// Loads configuration from `SOUNDSHIFT_CONFIG`, then `config.toml`, then
/// the environment alone.
fn read_config() -> Result<Config> {
    let explicit = std::env::var("SOUNDSHIFT_CONFIG").ok().map(PathBuf::from);
    let default_path = PathBuf::from("config.toml");

    match explicit {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None if default_path.exists() => {
            info!("Loading configuration from {:?}", default_path);
            load_config(&default_path)
                .with_context(|| format!("Failed to load config from {:?}", default_path))
        }
        None => {
            info!("No config file, using defaults and environment");
            load_config_from_env().context("Failed to load config from environment")
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
