use std::fmt;
use std::path::Path;

/// Audio containers accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Mp4,
    Webm,
    Ogg,
    Flac,
}

impl AudioFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "mp4" | "aac" => Some(AudioFormat::Mp4),
            "webm" => Some(AudioFormat::Webm),
            "ogg" | "oga" | "opus" => Some(AudioFormat::Ogg),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }

    /// Sniff the content first; fall back to the file extension only when the
    /// content isn't recognized at all.
    pub fn detect(data: &[u8], filename: &str) -> Option<Self> {
        if let Some(kind) = infer::get(data) {
            return Self::from_extension(kind.extension());
        }
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
        }
    }

    /// Bitrate used to guess the duration of compressed uploads.
    pub fn typical_kbps(&self) -> u32 {
        match self {
            AudioFormat::Wav => 1411,
            AudioFormat::Mp3 | AudioFormat::Mp4 | AudioFormat::Webm => 128,
            AudioFormat::Ogg => 160,
            AudioFormat::Flac => 900,
        }
    }

    /// Content type for serving a stored file, by extension.
    pub fn mime_for_path(path: &Path) -> &'static str {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream")
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}
