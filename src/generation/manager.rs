//! Entry point for generation requests.

use super::models::{GenerateRequest, GenerateResponse, GenerationError, JobCompletion};
use super::worker_pool::WorkerPoolHandle;
use crate::studio_store::{
    InstrumentConfig, Job, JobStatus, JobUpdate, Scale, StoreError, StudioStore, MAX_INSTRUMENTS,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info};

const MIN_BPM: f64 = 20.0;
const MAX_BPM: f64 = 300.0;

lazy_static! {
    static ref PITCH_NAME: Regex =
        Regex::new(r"^[A-Ga-g](#|b)?$").expect("Failed to compile pitch name regex");
}

/// A request that passed validation.
struct ValidatedRequest {
    track_id: String,
    bpm: f64,
    key: String,
    scale: Scale,
    instruments: Vec<InstrumentConfig>,
}

fn validate_instruments(instruments: &[InstrumentConfig]) -> Result<(), GenerationError> {
    if instruments.len() > MAX_INSTRUMENTS {
        return Err(GenerationError::invalid(format!(
            "At most {} instruments are supported",
            MAX_INSTRUMENTS
        )));
    }
    if !instruments.iter().any(|i| i.enabled) {
        return Err(GenerationError::invalid(
            "At least one instrument must be enabled",
        ));
    }
    for instrument in instruments {
        if instrument.volume > 100 {
            return Err(GenerationError::invalid(format!(
                "Volume of {} must be between 0 and 100",
                instrument.name
            )));
        }
        if let Some(complexity) = instrument.complexity {
            if !(1..=5).contains(&complexity) {
                return Err(GenerationError::invalid(format!(
                    "Complexity of {} must be between 1 and 5",
                    instrument.name
                )));
            }
        }
    }
    Ok(())
}

pub struct GenerationManager {
    store: Arc<dyn StudioStore>,
    pool: WorkerPoolHandle,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn StudioStore>, pool: WorkerPoolHandle) -> Self {
        Self { store, pool }
    }

    pub fn pool(&self) -> &WorkerPoolHandle {
        &self.pool
    }

    /// Checks run in a fixed order and all of them before anything is written.
    fn validate(&self, request: GenerateRequest) -> Result<ValidatedRequest, GenerationError> {
        let track_id = request
            .track_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid("Missing required parameter: trackId"))?;

        match self.store.get_track(&track_id) {
            Ok(_) => {}
            Err(StoreError::TrackNotFound(_)) => {
                return Err(GenerationError::NotFound(format!(
                    "Track not found: {}",
                    track_id
                )))
            }
            Err(e) => return Err(e.into()),
        }

        let (bpm, key, scale) = match (request.bpm, request.key, request.scale) {
            (Some(bpm), Some(key), Some(scale)) => (bpm, key, scale),
            _ => {
                return Err(GenerationError::invalid(
                    "Missing required parameters: bpm, key, scale",
                ))
            }
        };

        if !bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(GenerationError::invalid(format!(
                "bpm must be between {} and {}",
                MIN_BPM, MAX_BPM
            )));
        }
        let key = key.trim().to_string();
        if !PITCH_NAME.is_match(&key) {
            return Err(GenerationError::invalid(format!("Invalid key: {}", key)));
        }
        let scale: Scale = scale.parse().map_err(GenerationError::InvalidRequest)?;

        validate_instruments(&request.instruments)?;

        Ok(ValidatedRequest {
            track_id,
            bpm,
            key,
            scale,
            instruments: request.instruments,
        })
    }

    /// Validate, record a queued job against its track and hand it to the
    /// worker pool. Returns as soon as the pool owns the job.
    pub async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, GenerationError> {
        let request = self.validate(request)?;

        let job = Job::new(
            &request.track_id,
            request.bpm,
            request.key,
            request.scale,
            request.instruments,
        );
        let job_id = job.job_id.clone();
        self.store.create_job(job).map_err(|e| match e {
            StoreError::TrackNotFound(id) => {
                GenerationError::NotFound(format!("Track not found: {}", id))
            }
            other => other.into(),
        })?;
        info!("Queued job {} for track {}", job_id, request.track_id);

        let status = match self.pool.dispatch(&job_id).await {
            Ok(()) => JobStatus::Queued,
            Err(e) => {
                error!("Failed to dispatch job {}: {}", job_id, e);
                let message = format!("Failed to schedule generation: {}", e);
                match self.store.update_job(&job_id, JobUpdate::failed(message)) {
                    Ok(job) => job.status,
                    Err(e) => {
                        error!("Failed to mark job {} as failed: {}", job_id, e);
                        JobStatus::Error
                    }
                }
            }
        };

        Ok(GenerateResponse {
            job_id,
            track_id: request.track_id,
            status,
        })
    }

    /// Wait until a job reaches a terminal state.
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<Job, GenerationError> {
        // Subscribe before looking so a completion can't slip in between.
        let completions = self.pool.subscribe();

        tokio::time::timeout(timeout, self.wait_terminal(job_id, completions))
            .await
            .map_err(|_| GenerationError::Timeout(job_id.to_string()))?
    }

    fn terminal_job(&self, job_id: &str) -> Result<Option<Job>, GenerationError> {
        let job = self.store.get_job(job_id).map_err(|e| match e {
            StoreError::JobNotFound(id) => {
                GenerationError::NotFound(format!("Job not found: {}", id))
            }
            other => other.into(),
        })?;
        Ok(job.status.is_terminal().then_some(job))
    }

    async fn wait_terminal(
        &self,
        job_id: &str,
        mut completions: broadcast::Receiver<JobCompletion>,
    ) -> Result<Job, GenerationError> {
        loop {
            if let Some(job) = self.terminal_job(job_id)? {
                return Ok(job);
            }
            loop {
                match completions.recv().await {
                    Ok(completion) if completion.job_id == job_id => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => {
                        return match self.terminal_job(job_id)? {
                            Some(job) => Ok(job),
                            None => Err(GenerationError::Abandoned(job_id.to_string())),
                        };
                    }
                }
            }
        }
    }
}
