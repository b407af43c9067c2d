//! Runs one job's synthesis from `queued` to a terminal state.

use super::cost_model::{CostModel, Workload};
use super::models::JobOutcome;
use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::studio_store::{Job, JobStatus, JobUpdate, StoreError, StudioStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct GenerationPipeline {
    store: Arc<dyn StudioStore>,
    artifacts: Arc<dyn ArtifactStore>,
    workload: Arc<dyn Workload>,
    cost_model: CostModel,
}

impl GenerationPipeline {
    pub fn new(
        store: Arc<dyn StudioStore>,
        artifacts: Arc<dyn ArtifactStore>,
        workload: Arc<dyn Workload>,
        cost_model: CostModel,
    ) -> Self {
        Self {
            store,
            artifacts,
            workload,
            cost_model,
        }
    }

    pub fn store(&self) -> &Arc<dyn StudioStore> {
        &self.store
    }

    /// Execute the job end to end. Processing failures are recorded on the job
    /// and reported through the outcome, never returned as errors.
    pub async fn execute(&self, job_id: &str) -> JobOutcome {
        let job = match self
            .store
            .update_job(job_id, JobUpdate::status(JobStatus::Processing))
        {
            Ok(job) => job,
            Err(e) => {
                warn!("Not starting job {}: {}", job_id, e);
                return JobOutcome::Discarded;
            }
        };
        info!(
            "Processing job {} for track {} ({} enabled instruments)",
            job_id,
            job.track_id,
            job.enabled_instruments().count()
        );

        match self.render(&job).await {
            Ok((mix, stems)) => self.finish(job_id, JobUpdate::done(mix, stems)).await,
            Err(e) => {
                let message = format!("Generation failed: {:#}", e);
                error!("Job {}: {}", job_id, message);
                if let Err(cleanup) = self.artifacts.delete_all(job_id).await {
                    warn!("Failed to remove partial artifacts of {}: {}", job_id, cleanup);
                }
                self.finish(job_id, JobUpdate::failed(message)).await
            }
        }
    }

    async fn render(&self, job: &Job) -> anyhow::Result<(String, Vec<String>)> {
        let estimate = self.cost_model.estimate(&job.instruments);
        debug!("Job {} estimated at {:?}", job.job_id, estimate);
        self.workload.run(&job.job_id, estimate).await?;

        let mut stems = Vec::new();
        for (index, instrument) in job.enabled_instruments().enumerate() {
            let kind = ArtifactKind::Stem {
                index,
                instrument: instrument.name,
            };
            stems.push(self.artifacts.create(&job.job_id, &kind).await?);
        }
        let mix = self.artifacts.create(&job.job_id, &ArtifactKind::Mix).await?;
        Ok((mix, stems))
    }

    async fn finish(&self, job_id: &str, update: JobUpdate) -> JobOutcome {
        let outcome = match &update.error_message {
            Some(message) => JobOutcome::Failed(message.clone()),
            None => JobOutcome::Done,
        };

        match self.store.update_job(job_id, update) {
            Ok(job) => {
                info!("Job {} finished with status {}", job_id, job.status);
                outcome
            }
            Err(StoreError::JobNotFound(_)) => {
                // Track was deleted while we were working.
                info!("Job {} disappeared during processing, discarding results", job_id);
                if let Err(e) = self.artifacts.delete_all(job_id).await {
                    warn!("Failed to remove artifacts of vanished job {}: {}", job_id, e);
                }
                JobOutcome::Discarded
            }
            Err(e) => {
                error!("Failed to record result of job {}: {}", job_id, e);
                JobOutcome::Discarded
            }
        }
    }
}
