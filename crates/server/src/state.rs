use std::sync::Arc;
use tokio::sync::Semaphore;

use soundshift_core::{Config, DomainAllowList, JobQueue, JobRunner, SanitizedConfig, WorkerPool};

/// Shared application state
pub struct AppState {
    config: Config,
    allow_list: DomainAllowList,
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    pool: Arc<WorkerPool>,
    /// Bounds concurrent direct-stream conversions by `worker.concurrency`.
    direct_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        config: Config,
        allow_list: DomainAllowList,
        queue: Arc<dyn JobQueue>,
        runner: Arc<JobRunner>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        let direct_slots = Arc::new(Semaphore::new(config.worker.concurrency.max(1)));
        Self {
            direct_slots,
            config,
            allow_list,
            queue,
            runner,
            pool,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn allow_list(&self) -> &DomainAllowList {
        &self.allow_list
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Runner used for direct-stream conversions, which bypass the queue.
    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn direct_slots(&self) -> &Arc<Semaphore> {
        &self.direct_slots
    }
}
