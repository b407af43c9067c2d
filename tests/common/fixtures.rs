//! Test data builders

use super::constants::*;
use beatify_server::wav::silent_wav;
use serde_json::{json, Value};

/// A small valid WAV file.
pub fn test_wav() -> Vec<u8> {
    silent_wav(TEST_WAV_SECONDS, TEST_WAV_SAMPLE_RATE).expect("Failed to render test WAV")
}

/// A valid generate request body with drums and bass enabled and piano off.
pub fn default_generate_body(track_id: &str) -> Value {
    json!({
        "trackId": track_id,
        "bpm": 120,
        "key": "C",
        "scale": "major",
        "instruments": [
            { "name": "drums", "enabled": true, "volume": 80 },
            { "name": "bass", "enabled": true, "volume": 70, "complexity": 4 },
            { "name": "piano", "enabled": false, "volume": 50 }
        ]
    })
}
