//! Read side of the studio plus track deletion.

use crate::artifacts::ArtifactStore;
use crate::intake::UploadIntake;
use crate::server::metrics;
use crate::studio_store::{
    InstrumentConfig, Job, JobStatus, Scale, StoreError, StoreStats, StudioStore, Track,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Public view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: String,
    pub track_id: String,
    pub status: JobStatus,
    pub bpm: f64,
    pub key: String,
    pub scale: Scale,
    pub instruments: Vec<InstrumentConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem_artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            track_id: job.track_id,
            status: job.status,
            bpm: job.bpm,
            key: job.key,
            scale: job.scale,
            instruments: job.instruments,
            mix_artifact_ref: job.mix_artifact_ref,
            stem_artifact_refs: job.stem_artifact_refs,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Public view of a track together with its jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub track_id: String,
    pub filename: String,
    pub duration_sec: f64,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<Scale>,
    pub created_at: DateTime<Utc>,
    /// Name under which the source media is served by `/api/files`.
    pub file_url: Option<String>,
    pub jobs: Vec<JobView>,
}

pub struct StatusService {
    store: Arc<dyn StudioStore>,
    artifacts: Arc<dyn ArtifactStore>,
    intake: Arc<UploadIntake>,
}

impl StatusService {
    pub fn new(
        store: Arc<dyn StudioStore>,
        artifacts: Arc<dyn ArtifactStore>,
        intake: Arc<UploadIntake>,
    ) -> Self {
        Self {
            store,
            artifacts,
            intake,
        }
    }

    pub fn get_job(&self, job_id: &str) -> Result<JobView, StoreError> {
        self.store.get_job(job_id).map(JobView::from)
    }

    pub fn get_track(&self, track_id: &str) -> Result<TrackView, StoreError> {
        let track = self.store.get_track(track_id)?;
        Ok(self.track_view(track))
    }

    /// Every track, newest first.
    pub fn list_tracks(&self) -> Vec<TrackView> {
        self.store
            .list_tracks()
            .into_iter()
            .map(|track| self.track_view(track))
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let stats = self.store.stats();
        metrics::set_tracks_total(stats.total_tracks);
        stats
    }

    /// Remove a track, its jobs, their artifacts and the source media.
    ///
    /// Storage cleanup failures are logged; the records are removed regardless.
    pub async fn delete_track(&self, track_id: &str) -> Result<(), StoreError> {
        let track = self.store.get_track(track_id)?;

        for job_id in &track.jobs {
            if let Err(e) = self.artifacts.delete_all(job_id).await {
                warn!("Failed to delete artifacts of job {}: {:#}", job_id, e);
            }
        }

        let deleted = self.store.delete_track(track_id)?;
        // Jobs may have written artifacts, or been created, since the first sweep.
        for job_id in &deleted.job_ids {
            if let Err(e) = self.artifacts.delete_all(job_id).await {
                warn!("Failed to delete artifacts of job {}: {:#}", job_id, e);
            }
        }

        if let Err(e) = self.intake.remove_source(&deleted.track).await {
            warn!("Failed to remove source of track {}: {}", track_id, e);
        }
        metrics::set_tracks_total(self.store.stats().total_tracks);
        info!(
            "Deleted track {} with {} jobs",
            track_id,
            deleted.job_ids.len()
        );
        Ok(())
    }

    fn track_view(&self, track: Track) -> TrackView {
        // A job can vanish between reading the track and reading the job.
        let jobs = track
            .jobs
            .iter()
            .filter_map(|job_id| self.store.get_job(job_id).ok())
            .map(JobView::from)
            .collect();
        let file_url = track
            .file_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| format!("/api/files/{}", n));

        TrackView {
            track_id: track.track_id,
            filename: track.filename,
            duration_sec: track.duration_sec,
            bpm: track.bpm,
            key: track.key,
            scale: track.scale,
            created_at: track.created_at,
            file_url,
            jobs,
        }
    }
}
