use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beatify_server::analysis::{Analyzer, EstimatingAnalyzer, ScriptAnalyzer};
use beatify_server::artifacts::FsArtifactStore;
use beatify_server::config;
use beatify_server::generation::SimulatedWorkload;
use beatify_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use beatify_server::studio_store::InMemoryStudioStore;
use beatify_server::{Studio, StudioParts};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding uploads and generated outputs.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Analysis script run for each track. Without it, analysis is estimated.
    #[clap(long, value_parser = parse_path)]
    pub analysis_script: Option<PathBuf>,

    /// Maximum number of generation jobs running at once.
    #[clap(long)]
    pub max_concurrent_jobs: Option<usize>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: args.data_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            analysis_script: args.analysis_script.clone(),
            max_concurrent_jobs: args.max_concurrent_jobs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = config::CliConfig::from(&cli_args);
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  port: {}", app_config.port);
    info!("  metrics_port: {}", app_config.metrics_port);
    info!("  logging_level: {}", app_config.logging_level);
    info!(
        "  max_concurrent_jobs: {}",
        app_config.generation.max_concurrent_jobs
    );
    info!("  time_scale: {}", app_config.generation.time_scale);
    match &app_config.analysis_script {
        Some(script) => info!("  analysis_script: {:?}", script),
        None => info!("  analysis_script: none (estimating)"),
    }

    metrics::init_metrics();

    let artifacts = FsArtifactStore::new(
        app_config.output_dir(),
        app_config.generation.artifact_secs,
    );
    artifacts
        .init()
        .await
        .context("Failed to prepare output directory")?;

    let analyzer: Arc<dyn Analyzer> = match &app_config.analysis_script {
        Some(script) => Arc::new(ScriptAnalyzer::new(script.clone())),
        None => Arc::new(EstimatingAnalyzer::new()),
    };

    let shutdown_token = CancellationToken::new();

    let (studio, pool) = Studio::build(
        StudioParts {
            store: Arc::new(InMemoryStudioStore::new()),
            artifacts: Arc::new(artifacts),
            workload: Arc::new(SimulatedWorkload::new(app_config.generation.time_scale)),
            analyzer,
            cost_model: app_config.generation.cost_model(),
            upload_dir: app_config.upload_dir(),
            max_upload_bytes: app_config.intake.max_upload_bytes,
            max_concurrent_jobs: app_config.generation.max_concurrent_jobs,
            shutdown_grace: app_config.generation.shutdown_grace(),
        },
        shutdown_token.clone(),
    );
    studio
        .intake
        .init()
        .await
        .context("Failed to prepare upload directory")?;

    let pool_task = tokio::spawn(pool.run());

    let metrics_port = app_config.metrics_port;
    let metrics_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics::run_metrics_server(metrics_port, metrics_shutdown).await {
            error!("Metrics server failed: {:#}", e);
        }
    });

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        signal_token.cancel();
    });

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        max_upload_bytes: app_config.intake.max_upload_bytes,
        output_dir: Some(app_config.output_dir()),
    };
    let result = run_server(server_config, &studio, shutdown_token.clone()).await;
    if let Err(e) = &result {
        error!("HTTP server stopped: {:#}", e);
    }

    shutdown_token.cancel();
    if let Err(e) = pool_task.await {
        error!("Worker pool task failed: {}", e);
    }
    info!("Shutdown complete");
    result
}
