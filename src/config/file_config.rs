use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub analysis_script: Option<String>,

    // Feature configs
    pub generation: Option<GenerationConfig>,
    pub intake: Option<IntakeConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_ms: Option<f64>,
    pub unit_ms: Option<f64>,
    pub baseline_complexity: Option<f64>,
    /// Multiplier applied to the estimated synthesis time. 0 disables waiting.
    pub time_scale: Option<f64>,
    pub max_concurrent_jobs: Option<usize>,
    pub shutdown_grace_secs: Option<u64>,
    /// Length of the placeholder audio written for each artifact.
    pub artifact_secs: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct IntakeConfig {
    pub max_upload_bytes: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
