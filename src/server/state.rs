use axum::extract::FromRef;

use crate::analysis::AnalysisService;
use crate::artifacts::ArtifactStore;
use crate::generation::GenerationManager;
use crate::intake::UploadIntake;
use crate::status::StatusService;
use crate::studio::Studio;
use crate::studio_store::StudioStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStudioStore = Arc<dyn StudioStore>;
pub type GuardedArtifactStore = Arc<dyn ArtifactStore>;
pub type GuardedUploadIntake = Arc<UploadIntake>;
pub type GuardedAnalysisService = Arc<AnalysisService>;
pub type GuardedGenerationManager = Arc<GenerationManager>;
pub type GuardedStatusService = Arc<StatusService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub store: GuardedStudioStore,
    pub artifacts: GuardedArtifactStore,
    pub intake: GuardedUploadIntake,
    pub analysis: GuardedAnalysisService,
    pub generation: GuardedGenerationManager,
    pub status: GuardedStatusService,
}

impl ServerState {
    pub fn new(config: ServerConfig, studio: &Studio) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
            store: studio.store.clone(),
            artifacts: studio.artifacts.clone(),
            intake: studio.intake.clone(),
            analysis: studio.analysis.clone(),
            generation: studio.generation.clone(),
            status: studio.status.clone(),
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedArtifactStore {
    fn from_ref(input: &ServerState) -> Self {
        input.artifacts.clone()
    }
}

impl FromRef<ServerState> for GuardedUploadIntake {
    fn from_ref(input: &ServerState) -> Self {
        input.intake.clone()
    }
}

impl FromRef<ServerState> for GuardedAnalysisService {
    fn from_ref(input: &ServerState) -> Self {
        input.analysis.clone()
    }
}

impl FromRef<ServerState> for GuardedGenerationManager {
    fn from_ref(input: &ServerState) -> Self {
        input.generation.clone()
    }
}

impl FromRef<ServerState> for GuardedStatusService {
    fn from_ref(input: &ServerState) -> Self {
        input.status.clone()
    }
}
