mod file_config;

pub use file_config::{FileConfig, GenerationConfig, IntakeConfig};

use crate::generation::CostModel;
use crate::intake::DEFAULT_MAX_UPLOAD_BYTES;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub analysis_script: Option<PathBuf>,
    pub max_concurrent_jobs: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    /// When set, tracks are analyzed by this script instead of estimated.
    pub analysis_script: Option<PathBuf>,

    // Feature configs (with defaults)
    pub generation: GenerationSettings,
    pub intake: IntakeSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;
        if data_dir.exists() && !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ (both {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let analysis_script = file
            .analysis_script
            .map(PathBuf::from)
            .or_else(|| cli.analysis_script.clone());
        if let Some(script) = &analysis_script {
            if !script.is_file() {
                bail!("Analysis script not found: {:?}", script);
            }
        }

        // Generation settings - merge file config with defaults
        let gen_file = file.generation.unwrap_or_default();
        let defaults = GenerationSettings::default();
        let generation = GenerationSettings {
            base_ms: gen_file.base_ms.unwrap_or(defaults.base_ms),
            unit_ms: gen_file.unit_ms.unwrap_or(defaults.unit_ms),
            baseline_complexity: gen_file
                .baseline_complexity
                .unwrap_or(defaults.baseline_complexity),
            time_scale: gen_file.time_scale.unwrap_or(defaults.time_scale),
            max_concurrent_jobs: gen_file
                .max_concurrent_jobs
                .or(cli.max_concurrent_jobs)
                .unwrap_or(defaults.max_concurrent_jobs),
            shutdown_grace_secs: gen_file
                .shutdown_grace_secs
                .unwrap_or(defaults.shutdown_grace_secs),
            artifact_secs: gen_file.artifact_secs.unwrap_or(defaults.artifact_secs),
        };
        generation.validate()?;

        let intake_file = file.intake.unwrap_or_default();
        let intake = IntakeSettings {
            max_upload_bytes: intake_file
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };
        if intake.max_upload_bytes == 0 {
            bail!("intake.max_upload_bytes must be greater than 0");
        }

        Ok(Self {
            data_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            analysis_script,
            generation,
            intake,
        })
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }
}

/// Upper bound for `base_ms` and `unit_ms` (one hour).
pub const MAX_COST_MS: f64 = 3_600_000.0;
pub const MAX_TIME_SCALE: f64 = 1000.0;
pub const MAX_ARTIFACT_SECS: f32 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub base_ms: f64,
    pub unit_ms: f64,
    pub baseline_complexity: f64,
    pub time_scale: f64,
    pub max_concurrent_jobs: usize,
    pub shutdown_grace_secs: u64,
    pub artifact_secs: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let cost = CostModel::default();
        Self {
            base_ms: cost.base_ms,
            unit_ms: cost.unit_ms,
            baseline_complexity: cost.baseline_complexity,
            time_scale: 1.0,
            max_concurrent_jobs: 4,
            shutdown_grace_secs: 30,
            artifact_secs: 4.0,
        }
    }
}

impl GenerationSettings {
    fn validate(&self) -> Result<()> {
        for (name, value) in [("base_ms", self.base_ms), ("unit_ms", self.unit_ms)] {
            if !(0.0..=MAX_COST_MS).contains(&value) {
                bail!("generation.{} must be between 0 and {}", name, MAX_COST_MS);
            }
        }
        if !self.baseline_complexity.is_finite() || self.baseline_complexity <= 0.0 {
            bail!("generation.baseline_complexity must be greater than 0");
        }
        if !(0.0..=MAX_TIME_SCALE).contains(&self.time_scale) {
            bail!(
                "generation.time_scale must be between 0 and {}",
                MAX_TIME_SCALE
            );
        }
        if self.max_concurrent_jobs == 0 {
            bail!("generation.max_concurrent_jobs must be at least 1");
        }
        if self.artifact_secs <= 0.0 || !(0.0..=MAX_ARTIFACT_SECS).contains(&self.artifact_secs) {
            bail!(
                "generation.artifact_secs must be greater than 0 and at most {}",
                MAX_ARTIFACT_SECS
            );
        }
        Ok(())
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel {
            base_ms: self.base_ms,
            unit_ms: self.unit_ms,
            baseline_complexity: self.baseline_complexity,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeSettings {
    pub max_upload_bytes: u64,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_for(dir: &TempDir) -> CliConfig {
        CliConfig {
            data_dir: Some(dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: Some("/frontend".to_string()),
            analysis_script: None,
            max_concurrent_jobs: Some(2),
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = cli_for(&temp_dir);

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.upload_dir(), temp_dir.path().join("uploads"));
        assert_eq!(config.output_dir(), temp_dir.path().join("outputs"));
        assert_eq!(config.generation.max_concurrent_jobs, 2);
        assert_eq!(config.generation.cost_model(), CostModel::default());
        assert_eq!(config.intake, IntakeSettings::default());
    }

    #[test]
    fn test_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        let cli = cli_for(&temp_dir);

        let toml_str = format!(
            r#"
            data_dir = "{}"
            port = 4000
            logging_level = "none"

            [generation]
            base_ms = 500.0
            time_scale = 0.0
            max_concurrent_jobs = 8

            [intake]
            max_upload_bytes = 1024
            "#,
            other_dir.path().display()
        );
        let file: FileConfig = toml::from_str(&toml_str).unwrap();

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.data_dir, other_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::None);
        assert_eq!(config.generation.base_ms, 500.0);
        assert_eq!(config.generation.unit_ms, 1000.0);
        assert_eq!(config.generation.time_scale, 0.0);
        assert_eq!(config.generation.max_concurrent_jobs, 8);
        assert_eq!(config.intake.max_upload_bytes, 1024);
    }

    #[test]
    fn test_invalid_logging_level_falls_back_to_cli() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileConfig {
            logging_level: Some("loud".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli_for(&temp_dir), Some(file)).unwrap();

        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
    }

    #[test]
    fn test_missing_data_dir() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("data_dir"));
    }

    #[test]
    fn test_data_dir_must_be_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("file");
        std::fs::write(&file_path, "x").unwrap();
        let cli = CliConfig {
            data_dir: Some(file_path),
            port: 1,
            metrics_port: 2,
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_rejects_bad_generation_settings() {
        let temp_dir = TempDir::new().unwrap();
        for toml_str in [
            "[generation]\nbaseline_complexity = 0.0",
            "[generation]\ntime_scale = -1.0",
            "[generation]\ntime_scale = inf",
            "[generation]\nbase_ms = nan",
            "[generation]\nunit_ms = inf",
            "[generation]\nbase_ms = 1e300",
            "[generation]\nbaseline_complexity = inf",
            "[generation]\nartifact_secs = nan",
            "[generation]\nmax_concurrent_jobs = 0",
            "[intake]\nmax_upload_bytes = 0",
        ] {
            let file: FileConfig = toml::from_str(toml_str).unwrap();
            assert!(
                AppConfig::resolve(&cli_for(&temp_dir), Some(file)).is_err(),
                "accepted {}",
                toml_str
            );
        }
    }

    #[test]
    fn test_missing_analysis_script() {
        let temp_dir = TempDir::new().unwrap();
        let mut cli = cli_for(&temp_dir);
        cli.analysis_script = Some(temp_dir.path().join("nope.py"));
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_load_file_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "port = 1234\n[generation]\nunit_ms = 10.0\n").unwrap();

        let file = FileConfig::load(&path).unwrap();

        assert_eq!(file.port, Some(1234));
        assert_eq!(file.generation.unwrap().unit_ms, Some(10.0));
        assert!(FileConfig::load(&temp_dir.path().join("missing.toml")).is_err());
    }
}
