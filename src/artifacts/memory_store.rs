//! Artifact store keeping rendered bytes in memory.

use super::{artifact_ref, ArtifactKind, ArtifactStore};
use crate::wav::silent_wav;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryArtifactStore {
    /// job id -> file name -> bytes
    artifacts: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts currently held for a job.
    pub fn count_for(&self, job_id: &str) -> usize {
        self.artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(job_id)
            .map(|files| files.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn create(&self, job_id: &str, kind: &ArtifactKind) -> Result<String> {
        let bytes = silent_wav(0.1, 8_000)?;
        self.artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(job_id.to_string())
            .or_default()
            .insert(kind.file_name(), bytes);
        Ok(artifact_ref(job_id, kind))
    }

    async fn delete_all(&self, job_id: &str) -> Result<()> {
        self.artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(job_id);
        Ok(())
    }

    async fn read(&self, job_id: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(job_id)
            .and_then(|files| files.get(file_name).cloned()))
    }
}
