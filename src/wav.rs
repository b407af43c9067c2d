//! WAV helpers: placeholder rendering and duration of uploaded files.

use std::io::Cursor;

/// Render a mono 16-bit PCM file of silence.
pub fn silent_wav(duration_secs: f32, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let total_samples = (duration_secs.max(0.0) * sample_rate as f32) as u32;

    let mut buffer = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)?;
    for _ in 0..total_samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(buffer)
}

/// Duration in seconds declared by a WAV file.
///
/// Returns `None` for anything hound can't read as WAV.
pub fn wav_duration_secs(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / sample_rate as f64)
}
