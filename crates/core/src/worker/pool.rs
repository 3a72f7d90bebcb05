//! Fixed-size pool of queue consumers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::job::{JobError, JobRunner};
use crate::metrics::JOB_RETRIES;
use crate::queue::{Job, JobQueue, Redelivery};

use super::types::WorkerPoolStatus;

#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

/// Runs `concurrency` workers, each processing one job at a time.
pub struct WorkerPool {
    concurrency: usize,
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    stats: Arc<PoolStats>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(concurrency: usize, queue: Arc<dyn JobQueue>, runner: Arc<JobRunner>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            concurrency: concurrency.max(1),
            queue,
            runner,
            stats: Arc::new(PoolStats::default()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker tasks.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Worker pool already running");
            return;
        }

        let mut handles = self.handles.lock().await;
        for worker_id in 0..self.concurrency {
            handles.push(self.spawn_worker(worker_id));
        }

        info!(concurrency = self.concurrency, "Worker pool started");
    }

    /// Stops taking jobs and waits for in-flight jobs to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Worker pool not running");
            return;
        }

        info!("Stopping worker pool");
        let _ = self.shutdown_tx.send(());
        self.queue.close().await;

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task ended abnormally");
            }
        }

        info!("Worker pool stopped");
    }

    pub async fn status(&self) -> WorkerPoolStatus {
        WorkerPoolStatus {
            running: self.running.load(Ordering::Relaxed),
            concurrency: self.concurrency,
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            queued_jobs: self.queue.pending().await,
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }

    fn spawn_worker(&self, worker_id: usize) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let runner = Arc::clone(&self.runner);
        let stats = Arc::clone(&self.stats);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(worker_id, "Worker started");
            loop {
                let job = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    job = queue.next() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };

                stats.active.fetch_add(1, Ordering::Relaxed);
                process_job(&queue, &runner, &stats, job).await;
                stats.active.fetch_sub(1, Ordering::Relaxed);
            }
            debug!(worker_id, "Worker stopped");
        })
    }
}

/// Runs one delivery and settles it with the queue.
async fn process_job(
    queue: &Arc<dyn JobQueue>,
    runner: &Arc<JobRunner>,
    stats: &PoolStats,
    job: Job,
) {
    let job_id = job.id.clone();

    // The attempt runs in its own task so a panic fails the job instead of
    // killing the worker.
    let handle = {
        let runner = Arc::clone(runner);
        let job = job.clone();
        tokio::spawn(async move { runner.run(&job).await.map(|_| ()) })
    };

    let (err, notified) = match handle.await {
        Ok(Ok(())) => {
            stats.total_processed.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = queue.ack(&job_id).await {
                error!(job_id = %job_id, error = %e, "Failed to ack job");
            }
            return;
        }
        Ok(Err(err)) => {
            let notified = !JobRunner::will_retry(&job, &err);
            (err, notified)
        }
        Err(join_err) => {
            error!(job_id = %job_id, error = %join_err, "Job task panicked");
            (JobError::internal(format!("job task failed: {}", join_err)), false)
        }
    };

    stats.total_failed.fetch_add(1, Ordering::Relaxed);
    let retry = JobRunner::will_retry(&job, &err);

    match queue.nack(&job_id, &err.to_string(), retry).await {
        Ok(Redelivery::Requeued) => {
            JOB_RETRIES.inc();
        }
        Ok(Redelivery::Exhausted) => {
            if !notified {
                runner.notify_failure(&job, &err).await;
            }
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to nack job");
            if !notified {
                runner.notify_failure(&job, &err).await;
            }
        }
    }
}
