use crate::studio_store::{InstrumentConfig, JobStatus, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of a generation request. Every field is optional on the wire so that
/// missing values surface as validation errors rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub track_id: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<String>,
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: String,
    pub track_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Timed out waiting for job {0}")]
    Timeout(String),

    #[error("Job {0} will not complete: worker pool stopped")]
    Abandoned(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GenerationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidRequest(message.into())
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    Failed(String),
    /// The job vanished (track deleted) or was already finalized; nothing was
    /// recorded.
    Discarded,
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Done => "done",
            JobOutcome::Failed(_) => "error",
            JobOutcome::Discarded => "discarded",
        }
    }
}

/// Broadcast once a job's pipeline task has finished.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub job_id: String,
    pub outcome: JobOutcome,
}
