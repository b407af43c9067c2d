//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own data directory, in-memory
//! store and worker pool.

use super::constants::*;
use beatify_server::analysis::EstimatingAnalyzer;
use beatify_server::artifacts::FsArtifactStore;
use beatify_server::generation::{CostModel, SimulatedWorkload};
use beatify_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use beatify_server::studio_store::InMemoryStudioStore;
use beatify_server::{Studio, StudioParts};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated data directory
///
/// When dropped, the server and its worker pool shut down and the temp
/// directory is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    /// Services behind the server, for direct inspection in tests
    #[allow(dead_code)]
    pub studio: Studio,

    /// Root of the server's data directory
    #[allow(dead_code)]
    pub data_dir: PathBuf,

    _temp_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port with two worker slots.
    pub async fn spawn() -> Self {
        Self::spawn_with_slots(2).await
    }

    /// Spawns a new test server allowing `max_concurrent_jobs` running jobs.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory, port binding or server startup fails.
    pub async fn spawn_with_slots(max_concurrent_jobs: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().to_path_buf();
        let output_dir = data_dir.join("outputs");

        let artifacts = FsArtifactStore::new(output_dir.clone(), 0.1);
        artifacts
            .init()
            .await
            .expect("Failed to create output dir");

        let shutdown = CancellationToken::new();
        let (studio, pool) = Studio::build(
            StudioParts {
                store: Arc::new(InMemoryStudioStore::new()),
                artifacts: Arc::new(artifacts),
                workload: Arc::new(SimulatedWorkload::new(TEST_TIME_SCALE)),
                analyzer: Arc::new(EstimatingAnalyzer::new()),
                cost_model: CostModel::default(),
                upload_dir: data_dir.join("uploads"),
                max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
                max_concurrent_jobs,
                shutdown_grace: Duration::from_secs(1),
            },
            shutdown.clone(),
        );
        studio
            .intake
            .init()
            .await
            .expect("Failed to create upload dir");
        tokio::spawn(pool.run());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            frontend_dir_path: None,
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            output_dir: Some(output_dir),
        };
        let app = make_app(config, &studio);

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            studio,
            data_dir,
            _temp_dir: temp_dir,
            shutdown,
        };
        server.wait_for_ready().await;
        server
    }

    /// Waits for the server to become ready by polling the health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client
                .get(format!("{}/api/health", self.base_url))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
