//! Filesystem-backed artifact store.
//!
//! Layout: `<output_dir>/<job_id>/<file_name>`. Files are written to a temp
//! file in the job directory and renamed into place, so readers never see a
//! half-written artifact.

use super::{artifact_ref, ArtifactKind, ArtifactStore};
use crate::wav::silent_wav;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const PLACEHOLDER_SAMPLE_RATE: u32 = 22_050;

pub struct FsArtifactStore {
    output_dir: PathBuf,
    /// Length of the placeholder audio rendered for each artifact.
    render_secs: f32,
}

impl FsArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, render_secs: f32) -> Self {
        Self {
            output_dir: output_dir.into(),
            render_secs,
        }
    }

    /// Create the output directory if needed.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create output dir {:?}", self.output_dir))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn job_dir(&self, job_id: &str) -> Result<PathBuf> {
        // Job ids are UUIDs; anything else must not become a path component.
        if job_id.is_empty() || !job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!("Invalid job id: {:?}", job_id);
        }
        Ok(self.output_dir.join(job_id))
    }
}

fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dir.join(file_name))
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to persist {} in {:?}", file_name, dir))?;
    Ok(())
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn create(&self, job_id: &str, kind: &ArtifactKind) -> Result<String> {
        let dir = self.job_dir(job_id)?;
        let file_name = kind.file_name();
        let bytes = silent_wav(self.render_secs, PLACEHOLDER_SAMPLE_RATE)
            .context("Failed to render placeholder audio")?;

        let name = file_name.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &name, &bytes))
            .await
            .context("Artifact writer task failed")??;

        debug!("Rendered {} for job {}", file_name, job_id);
        Ok(artifact_ref(job_id, kind))
    }

    async fn delete_all(&self, job_id: &str) -> Result<()> {
        let dir = self.job_dir(job_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed artifacts of job {}", job_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", dir)),
        }
    }

    async fn read(&self, job_id: &str, file_name: &str) -> Result<Option<Vec<u8>>> {
        if !super::is_artifact_file_name(file_name) {
            return Ok(None);
        }
        let path = self.job_dir(job_id)?.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio_store::InstrumentName;
    use crate::wav::wav_duration_secs;
    use tempfile::TempDir;

    const JOB_ID: &str = "0b7d3f0e-1c1a-4c57-9b52-8f5b7f0f3a11";

    #[tokio::test]
    async fn create_read_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path(), 0.5);
        store.init().await.unwrap();

        let stem = ArtifactKind::Stem {
            index: 0,
            instrument: InstrumentName::Drums,
        };
        let stem_ref = store.create(JOB_ID, &stem).await.unwrap();
        let mix_ref = store.create(JOB_ID, &ArtifactKind::Mix).await.unwrap();

        assert_eq!(stem_ref, format!("/api/job/{}/stem-0.wav", JOB_ID));
        assert_eq!(mix_ref, format!("/api/job/{}/mix.wav", JOB_ID));

        let bytes = store.read(JOB_ID, "mix.wav").await.unwrap().unwrap();
        assert!((wav_duration_secs(&bytes).unwrap() - 0.5).abs() < 1e-3);

        store.delete_all(JOB_ID).await.unwrap();
        assert!(store.read(JOB_ID, "mix.wav").await.unwrap().is_none());
        assert!(!temp_dir.path().join(JOB_ID).exists());
    }

    #[tokio::test]
    async fn delete_all_of_unknown_job_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path(), 0.1);
        store.delete_all(JOB_ID).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_like_ids_and_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path(), 0.1);

        assert!(store.create("../escape", &ArtifactKind::Mix).await.is_err());
        assert!(store.read(JOB_ID, "../../etc/passwd").await.unwrap().is_none());
    }
}
