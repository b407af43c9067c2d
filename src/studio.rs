//! Wiring of the studio components around one shared store.

use crate::analysis::{AnalysisService, Analyzer};
use crate::artifacts::ArtifactStore;
use crate::generation::{
    create_worker_pool, CostModel, GenerationManager, GenerationPipeline, WorkerPool, Workload,
};
use crate::intake::UploadIntake;
use crate::status::StatusService;
use crate::studio_store::StudioStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything needed to assemble a [`Studio`].
pub struct StudioParts {
    pub store: Arc<dyn StudioStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub workload: Arc<dyn Workload>,
    pub analyzer: Arc<dyn Analyzer>,
    pub cost_model: CostModel,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub max_concurrent_jobs: usize,
    pub shutdown_grace: Duration,
}

/// The assembled services. Cheap to clone.
#[derive(Clone)]
pub struct Studio {
    pub store: Arc<dyn StudioStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub intake: Arc<UploadIntake>,
    pub analysis: Arc<AnalysisService>,
    pub generation: Arc<GenerationManager>,
    pub status: Arc<StatusService>,
}

impl Studio {
    /// Build the services. The returned pool must be spawned for jobs to run;
    /// it stops when `shutdown` is cancelled.
    pub fn build(parts: StudioParts, shutdown: CancellationToken) -> (Studio, WorkerPool) {
        let pipeline = Arc::new(GenerationPipeline::new(
            parts.store.clone(),
            parts.artifacts.clone(),
            parts.workload,
            parts.cost_model,
        ));
        let (pool, pool_handle) = create_worker_pool(
            pipeline,
            parts.max_concurrent_jobs,
            parts.shutdown_grace,
            shutdown,
        );

        let intake = Arc::new(UploadIntake::new(
            parts.store.clone(),
            parts.upload_dir,
            parts.max_upload_bytes,
        ));
        let studio = Studio {
            analysis: Arc::new(AnalysisService::new(parts.store.clone(), parts.analyzer)),
            generation: Arc::new(GenerationManager::new(parts.store.clone(), pool_handle)),
            status: Arc::new(StatusService::new(
                parts.store.clone(),
                parts.artifacts.clone(),
                intake.clone(),
            )),
            intake,
            store: parts.store,
            artifacts: parts.artifacts,
        };
        (studio, pool)
    }
}
