//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Service Endpoints
    // ========================================================================

    /// GET /api/health
    pub async fn health(&self) -> Response {
        self.client
            .get(self.url("/api/health"))
            .send()
            .await
            .expect("Health request failed")
    }

    /// GET /api/admin/stats
    pub async fn admin_stats(&self) -> Response {
        self.client
            .get(self.url("/api/admin/stats"))
            .send()
            .await
            .expect("Admin stats request failed")
    }

    // ========================================================================
    // Upload and Media
    // ========================================================================

    /// POST /api/upload
    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Response {
        let form = Form::new().part("file", Part::bytes(data).file_name(filename.to_string()));
        self.client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// POST /api/upload with a field other than `file`
    pub async fn upload_without_file(&self) -> Response {
        let form = Form::new().text("note", "no file here");
        self.client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// Uploads a file and returns the new track id.
    ///
    /// # Panics
    ///
    /// Panics if the upload is not accepted.
    pub async fn upload_track(&self, filename: &str, data: Vec<u8>) -> String {
        let response = self.upload(filename, data).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Invalid upload response");
        body["trackId"]
            .as_str()
            .expect("Upload response without trackId")
            .to_string()
    }

    /// GET /api/files/{filename}
    pub async fn get_file(&self, filename: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/files/{}", filename)))
            .send()
            .await
            .expect("File request failed")
    }

    /// GET /api/job/{job_id}/{artifact}
    pub async fn get_artifact(&self, job_id: &str, artifact: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/job/{}/{}", job_id, artifact)))
            .send()
            .await
            .expect("Artifact request failed")
    }

    /// GET on an artifact reference as returned in a job view
    pub async fn get_ref(&self, artifact_ref: &str) -> Response {
        self.client
            .get(self.url(artifact_ref))
            .send()
            .await
            .expect("Artifact request failed")
    }

    // ========================================================================
    // Generation and Analysis
    // ========================================================================

    /// POST /api/generate
    pub async fn generate(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/api/generate"))
            .json(body)
            .send()
            .await
            .expect("Generate request failed")
    }

    /// POST /api/generate and return the job id.
    ///
    /// # Panics
    ///
    /// Panics if the request is not accepted.
    pub async fn generate_job(&self, body: &Value) -> String {
        let response = self.generate(body).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Invalid generate response");
        body["jobId"]
            .as_str()
            .expect("Generate response without jobId")
            .to_string()
    }

    /// POST /api/analyze
    pub async fn analyze(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/api/analyze"))
            .json(body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// GET /api/job/{job_id}
    pub async fn get_job(&self, job_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/job/{}", job_id)))
            .send()
            .await
            .expect("Job request failed")
    }

    /// Polls a job until its status is `done` or `error` and returns the view.
    ///
    /// # Panics
    ///
    /// Panics if the job does not finish within [`JOB_TIMEOUT_MS`].
    pub async fn wait_for_job(&self, job_id: &str) -> Value {
        let start = std::time::Instant::now();
        loop {
            let response = self.get_job(job_id).await;
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let job: Value = response.json().await.expect("Invalid job response");
            if job["status"] == "done" || job["status"] == "error" {
                return job;
            }
            if start.elapsed() > Duration::from_millis(JOB_TIMEOUT_MS) {
                panic!("Job {} did not finish: {}", job_id, job);
            }
            tokio::time::sleep(Duration::from_millis(JOB_POLL_INTERVAL_MS)).await;
        }
    }

    /// GET /api/track/{track_id}
    pub async fn get_track(&self, track_id: &str) -> Response {
        self.client
            .get(self.url(&format!("/api/track/{}", track_id)))
            .send()
            .await
            .expect("Track request failed")
    }

    /// DELETE /api/track/{track_id}
    pub async fn delete_track(&self, track_id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/api/track/{}", track_id)))
            .send()
            .await
            .expect("Delete request failed")
    }

    /// GET /api/tracks
    pub async fn list_tracks(&self) -> Response {
        self.client
            .get(self.url("/api/tracks"))
            .send()
            .await
            .expect("Track list request failed")
    }
}
