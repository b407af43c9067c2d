//! StudioStore trait definition.
//!
//! The store is the single source of truth for tracks and jobs. Every other
//! component reads and writes through an injected `Arc<dyn StudioStore>`.

use super::models::{DeletedTrack, Job, JobStatus, JobUpdate, StoreStats, Track, TrackUpdate};
use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Track already exists: {0}")]
    DuplicateTrack(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    IllegalTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {0} already reached a terminal state")]
    JobFinalized(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::TrackNotFound(_) | StoreError::JobNotFound(_)
        )
    }
}

/// Trait for track/job storage backends.
pub trait StudioStore: Send + Sync {
    // =========================================================================
    // Tracks
    // =========================================================================

    /// Insert a new track. Fails if the id is already taken.
    fn create_track(&self, track: Track) -> Result<(), StoreError>;

    /// Get a snapshot of a track.
    fn get_track(&self, track_id: &str) -> Result<Track, StoreError>;

    /// All tracks, newest first.
    fn list_tracks(&self) -> Vec<Track>;

    /// Apply a partial update to a track.
    fn update_track(&self, track_id: &str, update: TrackUpdate) -> Result<Track, StoreError>;

    /// Remove a track together with every job listed in its `jobs`.
    fn delete_track(&self, track_id: &str) -> Result<DeletedTrack, StoreError>;

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Insert a job and append its id to the owning track as one unit.
    ///
    /// Readers never observe the job without its id in `Track.jobs`, or the
    /// other way around.
    fn create_job(&self, job: Job) -> Result<(), StoreError>;

    /// Get a snapshot of a job.
    fn get_job(&self, job_id: &str) -> Result<Job, StoreError>;

    /// Apply a partial update to a job, bumping `updated_at`.
    ///
    /// Rejects status regressions and any write to a job in a terminal state.
    fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<Job, StoreError>;

    /// Jobs of a track in creation order.
    fn list_jobs_by_track(&self, track_id: &str) -> Result<Vec<Job>, StoreError>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn stats(&self) -> StoreStats;
}
