//! Analyzer backed by an external analysis script.
//!
//! The script is invoked as `<interpreter> <script> <audio file>` and prints a
//! JSON document on stdout, possibly preceded by progress chatter:
//!
//! ```text
//! {"success": true, "analysis": {"key": "C", "scale": "major", "keyConfidence": 0.8,
//!  "bpm": 120.0, "tempoConfidence": 0.9, "duration": 30.0}}
//! {"success": false, "error": "..."}
//! ```

use super::{AnalysisError, AnalysisHints, AnalysisResult, Analyzer, Confidence};
use crate::studio_store::{Scale, Track};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptAnalysis {
    key: String,
    scale: String,
    #[serde(default)]
    key_confidence: f64,
    bpm: f64,
    #[serde(default)]
    tempo_confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ScriptOutput {
    success: bool,
    analysis: Option<ScriptAnalysis>,
    error: Option<String>,
}

pub struct ScriptAnalyzer {
    interpreter: String,
    script_path: PathBuf,
}

impl ScriptAnalyzer {
    pub fn new(script_path: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: "python3".to_string(),
            script_path: script_path.into(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }
}

/// Parse the script's stdout, ignoring anything before the first `{`.
fn parse_output(stdout: &str, hints: &AnalysisHints) -> Result<AnalysisResult, AnalysisError> {
    let start = stdout
        .find('{')
        .ok_or_else(|| AnalysisError::InvalidOutput("no JSON document in output".to_string()))?;
    let output: ScriptOutput = serde_json::from_str(stdout[start..].trim_end())
        .map_err(|e| AnalysisError::InvalidOutput(e.to_string()))?;

    if !output.success {
        return Err(AnalysisError::ScriptFailed(
            output.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    let analysis = output
        .analysis
        .ok_or_else(|| AnalysisError::InvalidOutput("missing analysis".to_string()))?;

    let scale = match hints.scale {
        Some(scale) => scale,
        None => analysis
            .scale
            .parse::<Scale>()
            .map_err(AnalysisError::InvalidOutput)?,
    };

    Ok(AnalysisResult {
        bpm: hints.bpm.unwrap_or(analysis.bpm),
        key: hints.key.clone().unwrap_or(analysis.key),
        scale,
        confidence: Confidence {
            bpm: analysis.tempo_confidence,
            key: analysis.key_confidence,
        },
    })
}

#[async_trait]
impl Analyzer for ScriptAnalyzer {
    async fn analyze(
        &self,
        track: &Track,
        hints: &AnalysisHints,
    ) -> Result<AnalysisResult, AnalysisError> {
        debug!("Running {:?} on {:?}", self.script_path, track.file_path);
        let output = Command::new(&self.interpreter)
            .arg(&self.script_path)
            .arg(&track.file_path)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            warn!(
                "Analysis script exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            // A failing script still reports its error as JSON when it can.
            return match parse_output(&stdout, hints) {
                Err(e @ AnalysisError::ScriptFailed(_)) => Err(e),
                _ => Err(AnalysisError::ScriptFailed(format!(
                    "exited with {}",
                    output.status
                ))),
            };
        }

        parse_output(&stdout, hints)
    }
}
