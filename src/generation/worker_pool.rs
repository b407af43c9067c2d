//! Runs generation pipelines in the background, one task per job.
//!
//! A single dispatcher loop owns the task handles. HTTP handlers talk to it
//! through a cloneable [`WorkerPoolHandle`], which can also answer whether a
//! job currently has an owning task and subscribe to completions.

use super::models::{JobCompletion, JobOutcome};
use super::pipeline::GenerationPipeline;
use crate::server::metrics;
use crate::studio_store::JobUpdate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 100;
const COMPLETION_BUFFER: usize = 256;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Job {0} already has a running task")]
    AlreadyRunning(String),

    #[error("Worker pool is not accepting jobs")]
    Unavailable,
}

/// Command sent to the dispatcher loop.
pub enum PoolCommand {
    Dispatch {
        job_id: String,
        response: oneshot::Sender<Result<(), DispatchError>>,
    },
}

/// State shared between the dispatcher loop and its handles.
#[derive(Default)]
pub struct SharedPoolState {
    /// Jobs that currently own a task, waiting for a slot or executing.
    pub running_jobs: HashSet<String>,
}

pub struct WorkerPool {
    pipeline: Arc<GenerationPipeline>,

    shared_state: Arc<RwLock<SharedPoolState>>,

    /// Task handles, managed by the dispatcher loop only.
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Bounds the number of pipelines executing at once.
    slots: Arc<Semaphore>,
    max_concurrent: usize,

    completion_tx: broadcast::Sender<JobCompletion>,
    command_receiver: mpsc::Receiver<PoolCommand>,
    shutdown_token: CancellationToken,
    shutdown_grace: Duration,
}

/// Create a worker pool and a handle to it. The pool does nothing until
/// [`WorkerPool::run`] is spawned.
pub fn create_worker_pool(
    pipeline: Arc<GenerationPipeline>,
    max_concurrent: usize,
    shutdown_grace: Duration,
    shutdown_token: CancellationToken,
) -> (WorkerPool, WorkerPoolHandle) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (completion_tx, _) = broadcast::channel(COMPLETION_BUFFER);
    let shared_state = Arc::new(RwLock::new(SharedPoolState::default()));
    let max_concurrent = max_concurrent.max(1);

    let pool = WorkerPool {
        pipeline,
        shared_state: shared_state.clone(),
        running_handles: HashMap::new(),
        slots: Arc::new(Semaphore::new(max_concurrent)),
        max_concurrent,
        completion_tx: completion_tx.clone(),
        command_receiver: command_rx,
        shutdown_token: shutdown_token.clone(),
        shutdown_grace,
    };
    let handle = WorkerPoolHandle {
        command_tx,
        shared_state,
        completion_tx,
        shutdown_token,
    };
    (pool, handle)
}

impl WorkerPool {
    /// Dispatcher loop. Returns after shutdown has drained running tasks.
    pub async fn run(mut self) {
        info!(
            "Starting worker pool with {} concurrent slots",
            self.max_concurrent
        );

        loop {
            self.cleanup_finished().await;

            tokio::select! {
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = tokio::time::sleep(CLEANUP_INTERVAL) => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Worker pool received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Worker pool stopped");
    }

    async fn handle_command(&mut self, cmd: PoolCommand) {
        match cmd {
            PoolCommand::Dispatch { job_id, response } => {
                let result = self.dispatch(job_id).await;
                let _ = response.send(result);
            }
        }
    }

    async fn dispatch(&mut self, job_id: String) -> Result<(), DispatchError> {
        {
            let mut state = self.shared_state.write().await;
            if !state.running_jobs.insert(job_id.clone()) {
                return Err(DispatchError::AlreadyRunning(job_id));
            }
        }

        debug!("Dispatching job {}", job_id);
        let handle = tokio::spawn(run_job(
            job_id.clone(),
            self.pipeline.clone(),
            self.slots.clone(),
            self.max_concurrent,
            self.shared_state.clone(),
            self.completion_tx.clone(),
        ));
        self.running_handles.insert(job_id, handle);
        Ok(())
    }

    async fn cleanup_finished(&mut self) {
        let finished: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in finished {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                if let Err(e) = handle.await {
                    error!("Task of job {} panicked: {}", job_id, e);
                    // The task never got to clear its own entry.
                    self.shared_state.write().await.running_jobs.remove(&job_id);
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        info!(
            "Shutting down worker pool, {} tasks outstanding",
            self.running_handles.len()
        );
        self.command_receiver.close();
        // Jobs still waiting for a slot give up; executing ones keep going.
        self.slots.close();

        let deadline = tokio::time::Instant::now() + self.shutdown_grace;
        for (job_id, handle) in self.running_handles.drain() {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("Job {} did not finish within the shutdown grace period", job_id);
                }
            }
        }
        info!("Worker pool shutdown complete");
    }
}

async fn run_job(
    job_id: String,
    pipeline: Arc<GenerationPipeline>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    shared_state: Arc<RwLock<SharedPoolState>>,
    completion_tx: broadcast::Sender<JobCompletion>,
) {
    let outcome = match slots.clone().acquire_owned().await {
        Ok(permit) => {
            metrics::set_running_jobs(max_concurrent - slots.available_permits());
            let start_time = Instant::now();
            let outcome = pipeline.execute(&job_id).await;
            let elapsed = start_time.elapsed();
            drop(permit);
            metrics::set_running_jobs(max_concurrent - slots.available_permits());
            metrics::record_generation_job(outcome.label(), elapsed);
            debug!("Job {} ended as {} after {:?}", job_id, outcome.label(), elapsed);
            outcome
        }
        Err(_) => {
            let message = "Generation cancelled: server shutting down".to_string();
            info!("Job {} never started: {}", job_id, message);
            match pipeline
                .store()
                .update_job(&job_id, JobUpdate::failed(message.clone()))
            {
                Ok(_) => JobOutcome::Failed(message),
                Err(_) => JobOutcome::Discarded,
            }
        }
    };

    shared_state.write().await.running_jobs.remove(&job_id);
    // Nobody listening is fine.
    let _ = completion_tx.send(JobCompletion { job_id, outcome });
}

/// Handle for submitting jobs and observing the pool.
#[derive(Clone)]
pub struct WorkerPoolHandle {
    command_tx: mpsc::Sender<PoolCommand>,
    shared_state: Arc<RwLock<SharedPoolState>>,
    completion_tx: broadcast::Sender<JobCompletion>,
    shutdown_token: CancellationToken,
}

impl WorkerPoolHandle {
    /// Hand a job to the pool. Returns once the pool has taken ownership of it,
    /// not when the job completes.
    pub async fn dispatch(&self, job_id: &str) -> Result<(), DispatchError> {
        if self.shutdown_token.is_cancelled() {
            return Err(DispatchError::Unavailable);
        }

        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(PoolCommand::Dispatch {
                job_id: job_id.to_string(),
                response: response_tx,
            })
            .await
            .map_err(|_| DispatchError::Unavailable)?;

        response_rx.await.map_err(|_| DispatchError::Unavailable)?
    }

    /// Whether a task currently owns the job.
    pub async fn is_running(&self, job_id: &str) -> bool {
        self.shared_state.read().await.running_jobs.contains(job_id)
    }

    pub async fn running_count(&self) -> usize {
        self.shared_state.read().await.running_jobs.len()
    }

    /// Receive every completion from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobCompletion> {
        self.completion_tx.subscribe()
    }
}
