//! Shared constants for end-to-end tests

// ============================================================================
// Test Media
// ============================================================================

/// Filename used for uploads in most tests
pub const TEST_UPLOAD_NAME: &str = "my song.wav";

/// Duration of the generated test WAV (seconds)
pub const TEST_WAV_SECONDS: f32 = 2.0;

/// Sample rate of the generated test WAV
pub const TEST_WAV_SAMPLE_RATE: u32 = 8_000;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Maximum time to wait for a job to reach a terminal status (milliseconds)
pub const JOB_TIMEOUT_MS: u64 = 10_000;

/// Polling interval when waiting for a job (milliseconds)
pub const JOB_POLL_INTERVAL_MS: u64 = 25;

/// Time scale applied to the simulated workload; 4 s estimates become 40 ms
pub const TEST_TIME_SCALE: f64 = 0.01;

/// Upload limit configured on the test server
pub const TEST_MAX_UPLOAD_BYTES: u64 = 256 * 1024;
