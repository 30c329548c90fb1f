//! Migration Worker
//!
//! Background task that runs queued migration jobs one at a time and,
//! on a fixed interval, sweeps the whole candidate pool. Logins enqueue
//! the groups they just assigned through a [`MigrationQueue`] handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idbridge_core::GroupId;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::directory::Directory;
use crate::error::{MigrationError, MigrationResult};
use crate::job::{JobArgument, JobReport, MigrateGroupsJob};
use crate::membership::MembershipStore;
use crate::registry::{CandidateRegistry, ConfigStore};
use crate::transition::TransitionStore;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to sweep the full candidate pool (in seconds).
    pub sweep_interval_secs: u64,

    /// Maximum number of queued jobs before `enqueue` waits.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3600,
            queue_capacity: 256,
        }
    }
}

/// Handle for submitting migration jobs to a running worker.
#[derive(Debug, Clone)]
pub struct MigrationQueue {
    sender: mpsc::Sender<JobArgument>,
}

impl MigrationQueue {
    /// Queue a job.
    pub async fn enqueue(&self, argument: JobArgument) -> MigrationResult<()> {
        self.sender
            .send(argument)
            .await
            .map_err(|_| MigrationError::QueueClosed)
    }

    /// Queue a job for `gids` only if a pending pool contains at least one
    /// of them. Returns whether a job was queued.
    pub async fn enqueue_if_candidates<C: ConfigStore>(
        &self,
        registry: &CandidateRegistry<C>,
        gids: &[GroupId],
    ) -> MigrationResult<bool> {
        let Some(pool) = registry.candidates().await else {
            return Ok(false);
        };

        let to_check: Vec<GroupId> = gids.iter().filter(|g| pool.contains(*g)).cloned().collect();
        if to_check.is_empty() {
            return Ok(false);
        }

        debug!(count = to_check.len(), "Queueing group migration check");
        self.enqueue(JobArgument::new(to_check)).await?;
        Ok(true)
    }
}

/// Runs migration jobs sequentially.
pub struct MigrationWorker<D, C, T, M> {
    job: Arc<MigrateGroupsJob<D, C, T, M>>,
    receiver: Mutex<mpsc::Receiver<JobArgument>>,
    config: WorkerConfig,
    shutdown: AtomicBool,
    wake: Notify,
}

impl<D, C, T, M> MigrationWorker<D, C, T, M>
where
    D: Directory,
    C: ConfigStore,
    T: TransitionStore,
    M: MembershipStore,
{
    /// Create a worker and the queue that feeds it.
    pub fn new(job: Arc<MigrateGroupsJob<D, C, T, M>>, config: WorkerConfig) -> (Self, MigrationQueue) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = Self {
            job,
            receiver: Mutex::new(receiver),
            config,
            shutdown: AtomicBool::new(false),
            wake: Notify::new(),
        };
        (worker, MigrationQueue { sender })
    }

    /// Run until shutdown is requested or every queue handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            sweep_interval_secs = self.config.sweep_interval_secs,
            "Starting group migration worker"
        );

        let mut receiver = self.receiver.lock().await;
        let mut sweep_interval = interval(Duration::from_secs(self.config.sweep_interval_secs.max(1)));
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.is_shutdown() {
                info!("Worker shutdown requested, stopping");
                break;
            }

            tokio::select! {
                () = self.wake.notified() => {}
                _ = sweep_interval.tick() => {
                    self.sweep().await;
                }
                queued = receiver.recv() => match queued {
                    Some(argument) => {
                        self.job.run(&argument).await;
                    }
                    None => {
                        info!("Migration queue closed, stopping");
                        break;
                    }
                },
            }
        }

        info!("Group migration worker stopped");
    }

    /// Request graceful shutdown. A job already running completes first.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Run a job over the whole pending pool.
    pub async fn sweep(&self) -> JobReport {
        let Some(pool) = self.job.registry().candidates().await else {
            debug!("No group migration pending, skipping sweep");
            return JobReport::default();
        };

        self.job
            .run(&JobArgument::new(pool.into_iter().collect()))
            .await
    }
}
