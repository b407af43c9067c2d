//! In-process, volatile implementation of [`StudioStore`].
//!
//! Every track and job lives behind its own mutex so writers of unrelated
//! entities never contend. The id -> entity maps are only write-locked for
//! inserts and removals.
//!
//! Lock order: track slot -> job slot -> maps. Map guards are never held
//! while acquiring a slot.

use super::models::{DeletedTrack, Job, JobStatus, JobUpdate, StoreStats, Track, TrackUpdate};
use super::trait_def::{StoreError, StudioStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

struct TrackSlot {
    track: Track,
    removed: bool,
}

struct JobSlot {
    job: Job,
    removed: bool,
}

type Shared<T> = Arc<Mutex<T>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct InMemoryStudioStore {
    tracks: RwLock<HashMap<String, Shared<TrackSlot>>>,
    jobs: RwLock<HashMap<String, Shared<JobSlot>>>,
}

impl InMemoryStudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn track_slot(&self, track_id: &str) -> Option<Shared<TrackSlot>> {
        self.tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(track_id)
            .cloned()
    }

    fn job_slot(&self, job_id: &str) -> Option<Shared<JobSlot>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    fn all_job_slots(&self) -> Vec<Shared<JobSlot>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl StudioStore for InMemoryStudioStore {
    fn create_track(&self, track: Track) -> Result<(), StoreError> {
        let mut tracks = self.tracks.write().unwrap_or_else(PoisonError::into_inner);
        if tracks.contains_key(&track.track_id) {
            return Err(StoreError::DuplicateTrack(track.track_id));
        }
        debug!("Created track {} ({})", track.track_id, track.filename);
        tracks.insert(
            track.track_id.clone(),
            Arc::new(Mutex::new(TrackSlot {
                track,
                removed: false,
            })),
        );
        Ok(())
    }

    fn get_track(&self, track_id: &str) -> Result<Track, StoreError> {
        let slot = self
            .track_slot(track_id)
            .ok_or_else(|| StoreError::TrackNotFound(track_id.to_string()))?;
        let slot = lock(&slot);
        if slot.removed {
            return Err(StoreError::TrackNotFound(track_id.to_string()));
        }
        Ok(slot.track.clone())
    }

    fn list_tracks(&self) -> Vec<Track> {
        let slots: Vec<_> = self
            .tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut tracks: Vec<Track> = slots
            .iter()
            .filter_map(|slot| {
                let slot = lock(slot);
                (!slot.removed).then(|| slot.track.clone())
            })
            .collect();
        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracks
    }

    fn update_track(&self, track_id: &str, update: TrackUpdate) -> Result<Track, StoreError> {
        let slot = self
            .track_slot(track_id)
            .ok_or_else(|| StoreError::TrackNotFound(track_id.to_string()))?;
        let mut slot = lock(&slot);
        if slot.removed {
            return Err(StoreError::TrackNotFound(track_id.to_string()));
        }
        update.apply(&mut slot.track);
        Ok(slot.track.clone())
    }

    fn delete_track(&self, track_id: &str) -> Result<DeletedTrack, StoreError> {
        let slot = self
            .track_slot(track_id)
            .ok_or_else(|| StoreError::TrackNotFound(track_id.to_string()))?;
        let mut slot = lock(&slot);
        if slot.removed {
            return Err(StoreError::TrackNotFound(track_id.to_string()));
        }
        slot.removed = true;

        let job_ids = slot.track.jobs.clone();
        for job_id in &job_ids {
            if let Some(job_slot) = self.job_slot(job_id) {
                lock(&job_slot).removed = true;
            }
        }

        {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            for job_id in &job_ids {
                jobs.remove(job_id);
            }
        }
        self.tracks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(track_id);

        debug!(
            "Deleted track {} together with {} jobs",
            track_id,
            job_ids.len()
        );

        Ok(DeletedTrack {
            track: slot.track.clone(),
            job_ids,
        })
    }

    fn create_job(&self, job: Job) -> Result<(), StoreError> {
        let track_slot = self
            .track_slot(&job.track_id)
            .ok_or_else(|| StoreError::TrackNotFound(job.track_id.clone()))?;
        // Holding the track guard for the whole insert+append keeps both
        // halves invisible to track readers until the unit is complete.
        let mut track_slot = lock(&track_slot);
        if track_slot.removed {
            return Err(StoreError::TrackNotFound(job.track_id.clone()));
        }

        let job_id = job.job_id.clone();
        {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            if jobs.contains_key(&job_id) {
                return Err(StoreError::DuplicateJob(job_id));
            }
            jobs.insert(
                job_id.clone(),
                Arc::new(Mutex::new(JobSlot {
                    job,
                    removed: false,
                })),
            );
        }
        track_slot.track.jobs.push(job_id);
        Ok(())
    }

    fn get_job(&self, job_id: &str) -> Result<Job, StoreError> {
        let slot = self
            .job_slot(job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        let slot = lock(&slot);
        if slot.removed {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }
        Ok(slot.job.clone())
    }

    fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<Job, StoreError> {
        let slot = self
            .job_slot(job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        let mut slot = lock(&slot);
        if slot.removed {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }

        let current = slot.job.status;
        if current.is_terminal() {
            return Err(StoreError::JobFinalized(job_id.to_string()));
        }
        if let Some(next) = update.status {
            if !current.can_transition_to(next) {
                return Err(StoreError::IllegalTransition {
                    job_id: job_id.to_string(),
                    from: current,
                    to: next,
                });
            }
        }

        update.apply(&mut slot.job);
        Ok(slot.job.clone())
    }

    fn list_jobs_by_track(&self, track_id: &str) -> Result<Vec<Job>, StoreError> {
        let track = self.get_track(track_id)?;
        Ok(track
            .jobs
            .iter()
            .filter_map(|job_id| self.get_job(job_id).ok())
            .collect())
    }

    fn stats(&self) -> StoreStats {
        let total_tracks = self
            .tracks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();

        let mut stats = StoreStats {
            total_tracks,
            ..Default::default()
        };
        for slot in self.all_job_slots() {
            let slot = lock(&slot);
            if slot.removed {
                continue;
            }
            stats.total_jobs += 1;
            match slot.job.status {
                JobStatus::Queued => stats.queued_count += 1,
                JobStatus::Processing => stats.processing_count += 1,
                JobStatus::Done => stats.done_count += 1,
                JobStatus::Error => stats.error_count += 1,
            }
        }
        stats
    }
}
