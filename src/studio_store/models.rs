//! Entity models for tracks and generation jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Complexity assumed for an instrument that doesn't specify one.
pub const DEFAULT_COMPLEXITY: u8 = 3;

/// Upper bound on the number of instrument entries in a single job.
pub const MAX_INSTRUMENTS: usize = 6;

/// Musical scale of a track or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
        }
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(Scale::Major),
            "minor" => Ok(Scale::Minor),
            other => Err(format!("Unknown scale: {}", other)),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruments the generator knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentName {
    Drums,
    Bass,
    Piano,
    Guitar,
    Strings,
    Synth,
}

impl InstrumentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentName::Drums => "drums",
            InstrumentName::Bass => "bass",
            InstrumentName::Piano => "piano",
            InstrumentName::Guitar => "guitar",
            InstrumentName::Strings => "strings",
            InstrumentName::Synth => "synth",
        }
    }
}

impl fmt::Display for InstrumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_style() -> String {
    "pop".to_string()
}

/// Per-instrument settings supplied with a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentConfig {
    pub name: InstrumentName,
    pub enabled: bool,
    /// 0..=100
    pub volume: u8,
    #[serde(default = "default_style")]
    pub style: String,
    /// 1..=5, `None` means [`DEFAULT_COMPLEXITY`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u8>,
}

impl InstrumentConfig {
    pub fn new(name: InstrumentName, enabled: bool) -> Self {
        Self {
            name,
            enabled,
            volume: 80,
            style: default_style(),
            complexity: None,
        }
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn effective_complexity(&self) -> u8 {
        self.complexity.unwrap_or(DEFAULT_COMPLEXITY)
    }
}

/// Lifecycle of a generation job.
///
/// Transitions only move forward: Queued -> Processing -> (Done | Error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,  // terminal
    Error, // terminal
}

impl JobStatus {
    /// Returns true if this is a terminal state (Done or Error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Done | JobStatus::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` keeps the status walk monotonic.
    ///
    /// Re-asserting the current non-terminal status is allowed; nothing leaves a
    /// terminal state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded source material plus its derived musical metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub track_id: String,
    pub filename: String,
    pub duration_sec: f64,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<Scale>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub file_path: PathBuf,
    /// Ids of the jobs created against this track, in creation order.
    pub jobs: Vec<String>,
}

impl Track {
    pub fn new(filename: impl Into<String>, duration_sec: f64, file_path: PathBuf) -> Self {
        Self {
            track_id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            duration_sec,
            bpm: None,
            key: None,
            scale: None,
            created_at: Utc::now(),
            file_path,
            jobs: Vec::new(),
        }
    }
}

/// One request to synthesize an accompaniment for a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub track_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub bpm: f64,
    pub key: String,
    pub scale: Scale,
    pub instruments: Vec<InstrumentConfig>,
    pub mix_artifact_ref: Option<String>,
    pub stem_artifact_refs: Option<Vec<String>>,
    pub error_message: Option<String>,
}

impl Job {
    /// Create a new queued job for the given track.
    pub fn new(
        track_id: impl Into<String>,
        bpm: f64,
        key: impl Into<String>,
        scale: Scale,
        instruments: Vec<InstrumentConfig>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            track_id: track_id.into(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            bpm,
            key: key.into(),
            scale,
            instruments,
            mix_artifact_ref: None,
            stem_artifact_refs: None,
            error_message: None,
        }
    }

    /// Enabled instruments, in request order.
    pub fn enabled_instruments(&self) -> impl Iterator<Item = &InstrumentConfig> {
        self.instruments.iter().filter(|i| i.enabled)
    }
}

/// Partial update applied to a track. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackUpdate {
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<Scale>,
}

impl TrackUpdate {
    pub(crate) fn apply(self, track: &mut Track) {
        if let Some(bpm) = self.bpm {
            track.bpm = Some(bpm);
        }
        if let Some(key) = self.key {
            track.key = Some(key);
        }
        if let Some(scale) = self.scale {
            track.scale = Some(scale);
        }
    }
}

/// Partial update applied to a job. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub mix_artifact_ref: Option<String>,
    pub stem_artifact_refs: Option<Vec<String>>,
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn done(mix_artifact_ref: String, stem_artifact_refs: Vec<String>) -> Self {
        Self {
            status: Some(JobStatus::Done),
            mix_artifact_ref: Some(mix_artifact_ref),
            stem_artifact_refs: Some(stem_artifact_refs),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(mix) = self.mix_artifact_ref {
            job.mix_artifact_ref = Some(mix);
        }
        if let Some(stems) = self.stem_artifact_refs {
            job.stem_artifact_refs = Some(stems);
        }
        if let Some(message) = self.error_message {
            job.error_message = Some(message);
        }
        job.updated_at = Utc::now();
    }
}

/// Aggregate counters over the repository contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_tracks: usize,
    pub total_jobs: usize,
    pub queued_count: usize,
    pub processing_count: usize,
    pub done_count: usize,
    pub error_count: usize,
}

/// What a cascade delete removed.
#[derive(Debug, Clone)]
pub struct DeletedTrack {
    pub track: Track,
    pub job_ids: Vec<String>,
}
