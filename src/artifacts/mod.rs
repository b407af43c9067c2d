//! Storage for rendered generation outputs (the mix and per-instrument stems).

mod fs_store;
mod memory_store;

pub use fs_store::FsArtifactStore;
pub use memory_store::InMemoryArtifactStore;

use crate::studio_store::InstrumentName;
use anyhow::Result;
use async_trait::async_trait;

/// What an artifact represents within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The combined accompaniment.
    Mix,
    /// One instrument's stem, `index` being its position among the enabled
    /// instruments.
    Stem {
        index: usize,
        instrument: InstrumentName,
    },
}

impl ArtifactKind {
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKind::Mix => "mix.wav".to_string(),
            ArtifactKind::Stem { index, .. } => format!("stem-{}.wav", index),
        }
    }
}

/// Public reference under which an artifact is served.
pub fn artifact_ref(job_id: &str, kind: &ArtifactKind) -> String {
    format!("/api/job/{}/{}", job_id, kind.file_name())
}

/// Whether `name` is a file name an artifact store could have produced.
///
/// Used to reject arbitrary paths before touching storage.
pub fn is_artifact_file_name(name: &str) -> bool {
    if name == "mix.wav" {
        return true;
    }
    name.strip_prefix("stem-")
        .and_then(|rest| rest.strip_suffix(".wav"))
        .map(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Render and store one artifact for a job, returning its reference.
    async fn create(&self, job_id: &str, kind: &ArtifactKind) -> Result<String>;

    /// Remove every artifact belonging to a job. Missing jobs are not an error.
    async fn delete_all(&self, job_id: &str) -> Result<()>;

    /// Read back an artifact's bytes, `None` if it doesn't exist.
    async fn read(&self, job_id: &str, file_name: &str) -> Result<Option<Vec<u8>>>;
}
