//! Upload intake: validates and stores source audio, then registers the track.

mod audio_format;

pub use audio_format::AudioFormat;

use crate::studio_store::{StoreError, StudioStore, Track};
use crate::wav::wav_duration_secs;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Default upload size limit, 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid file type. Please upload WAV, MP3, M4A, WebM, OGG or FLAC files.")]
    UnsupportedFileType,

    #[error("File too large: {0} bytes (max: {1})")]
    FileTooLarge(u64, u64),

    #[error("Empty upload")]
    Empty,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub track_id: String,
    pub original_filename: String,
    pub duration_sec: f64,
}

pub struct UploadIntake {
    store: Arc<dyn StudioStore>,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

impl UploadIntake {
    pub fn new(
        store: Arc<dyn StudioStore>,
        upload_dir: impl Into<PathBuf>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
            max_upload_bytes,
        }
    }

    /// Create the upload directory.
    pub async fn init(&self) -> Result<(), IntakeError> {
        fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// Validate, store and register an uploaded file.
    pub async fn ingest(
        &self,
        original_filename: &str,
        data: &[u8],
    ) -> Result<UploadResponse, IntakeError> {
        let size = data.len() as u64;
        if size == 0 {
            return Err(IntakeError::Empty);
        }
        if size > self.max_upload_bytes {
            return Err(IntakeError::FileTooLarge(size, self.max_upload_bytes));
        }

        let safe_filename = sanitize_filename(original_filename)?;
        let format = AudioFormat::detect(data, &safe_filename)
            .ok_or(IntakeError::UnsupportedFileType)?;
        let duration_sec = estimate_duration(format, data);

        let mut track = Track::new(original_filename, duration_sec, PathBuf::new());
        let file_path = self
            .upload_dir
            .join(format!("{}_{}", track.track_id, safe_filename));
        track.file_path = file_path.clone();

        fs::create_dir_all(&self.upload_dir).await?;
        let mut file = fs::File::create(&file_path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        debug!("Stored {} bytes of {} at {:?}", size, format, file_path);

        let track_id = track.track_id.clone();
        if let Err(e) = self.store.create_track(track) {
            let _ = fs::remove_file(&file_path).await;
            return Err(e.into());
        }
        info!(
            "Created track {} from {} ({:.1}s)",
            track_id, original_filename, duration_sec
        );

        Ok(UploadResponse {
            track_id,
            original_filename: original_filename.to_string(),
            duration_sec,
        })
    }

    /// Remove a track's stored source media. Missing files are ignored.
    pub async fn remove_source(&self, track: &Track) -> Result<(), IntakeError> {
        if track.file_path.as_os_str().is_empty() {
            return Ok(());
        }
        match fs::remove_file(&track.file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Source of track {} was already gone", track.track_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Path of a stored upload, if `file_name` is a plain name that exists.
    pub fn resolve_upload(&self, file_name: &str) -> Option<PathBuf> {
        if !is_plain_file_name(file_name) {
            return None;
        }
        let path = self.upload_dir.join(file_name);
        path.is_file().then_some(path)
    }
}

/// True for a single path component that can't escape its directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Sanitize a filename to prevent path traversal attacks.
fn sanitize_filename(filename: &str) -> Result<String, IntakeError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IntakeError::InvalidFilename(filename.to_string()))?;

    if name.contains('\0') || name.starts_with('.') {
        return Err(IntakeError::InvalidFilename(filename.to_string()));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() {
        return Err(IntakeError::InvalidFilename(filename.to_string()));
    }
    Ok(sanitized)
}

/// Duration from the WAV header when there is one, otherwise from the
/// format's typical bitrate.
fn estimate_duration(format: AudioFormat, data: &[u8]) -> f64 {
    if format == AudioFormat::Wav {
        if let Some(secs) = wav_duration_secs(data) {
            return secs;
        }
    }
    let bits = data.len() as f64 * 8.0;
    let secs = bits / (format.typical_kbps() as f64 * 1000.0);
    (secs * 10.0).round() / 10.0
}
