//! End-to-end tests for the generation workflow
//!
//! Covers POST /api/generate, GET /api/job/{id} and artifact download.
//! TestServer::spawn() runs a simulated workload scaled down so that each job
//! finishes within tens of milliseconds.

mod common;

use common::{default_generate_body, test_wav, TestClient, TestServer, TEST_UPLOAD_NAME};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_upload_generate_and_download_mix() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;

    let response = client.generate(&default_generate_body(&track_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["trackId"], track_id.as_str());
    assert_eq!(body["status"], "queued");
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let job = client.wait_for_job(&job_id).await;
    assert_eq!(job["status"], "done", "job failed: {}", job);
    assert_eq!(job["bpm"], 120.0);
    assert_eq!(job["key"], "C");
    assert_eq!(job["scale"], "major");
    assert!(job.get("errorMessage").is_none());

    let mix_ref = job["mixArtifactRef"].as_str().unwrap();
    assert_eq!(mix_ref, format!("/api/job/{}/mix.wav", job_id));

    // Piano is disabled, so only drums and bass get stems.
    let stems = job["stemArtifactRefs"].as_array().unwrap();
    assert_eq!(stems.len(), 2);
    assert_eq!(stems[0], format!("/api/job/{}/stem-0.wav", job_id).as_str());
    assert_eq!(stems[1], format!("/api/job/{}/stem-1.wav", job_id).as_str());

    let response = client.get_ref(mix_ref).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/wav"
    );
    let bytes = response.bytes().await.unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");

    let response = client.get_ref(stems[1].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_job_listed_on_track() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;
    let first = client.generate_job(&default_generate_body(&track_id)).await;
    let second = client.generate_job(&default_generate_body(&track_id)).await;
    client.wait_for_job(&first).await;
    client.wait_for_job(&second).await;

    let response = client.get_track(&track_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let track: Value = response.json().await.unwrap();
    let job_ids: Vec<&str> = track["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["jobId"].as_str().unwrap())
        .collect();
    assert_eq!(job_ids, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_generate_for_unknown_track_returns_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .generate(&default_generate_body("no-such-track"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no-such-track"));
}

#[tokio::test]
async fn test_generate_rejects_invalid_requests() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;

    let mut missing_key = default_generate_body(&track_id);
    missing_key.as_object_mut().unwrap().remove("key");

    let mut bad_bpm = default_generate_body(&track_id);
    bad_bpm["bpm"] = json!(900);

    let mut bad_key = default_generate_body(&track_id);
    bad_key["key"] = json!("H#");

    let mut bad_scale = default_generate_body(&track_id);
    bad_scale["scale"] = json!("dorian");

    let mut nothing_enabled = default_generate_body(&track_id);
    nothing_enabled["instruments"] = json!([
        { "name": "drums", "enabled": false, "volume": 80 }
    ]);

    let mut bad_complexity = default_generate_body(&track_id);
    bad_complexity["instruments"][0]["complexity"] = json!(9);

    for body in [
        json!({ "bpm": 120, "key": "C", "scale": "major" }),
        missing_key,
        bad_bpm,
        bad_key,
        bad_scale,
        nothing_enabled,
        bad_complexity,
    ] {
        let response = client.generate(&body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }

    // Nothing was recorded for the rejected requests.
    let track: Value = client.get_track(&track_id).await.json().await.unwrap();
    assert!(track["jobs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_with_malformed_json_returns_bad_request() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/api/generate", server.base_url))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_returns_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_job("missing-job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get_artifact("missing-job", "mix.wav").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_artifact_of_finished_job_returns_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;
    let job_id = client.generate_job(&default_generate_body(&track_id)).await;
    client.wait_for_job(&job_id).await;

    let response = client.get_artifact(&job_id, "stem-5.wav").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get_artifact(&job_id, "notes.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_generates_all_complete() {
    let server = TestServer::spawn_with_slots(1).await;
    let client = TestClient::new(server.base_url.clone());
    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;

    let body = default_generate_body(&track_id);
    let requests = (0..5).map(|_| client.generate_job(&body));
    let job_ids = futures::future::join_all(requests).await;

    let mut unique = job_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);

    for job_id in &job_ids {
        let job = client.wait_for_job(job_id).await;
        assert_eq!(job["status"], "done");
    }

    let stats: Value = client.admin_stats().await.json().await.unwrap();
    assert_eq!(stats["totalJobs"], 5);
    assert_eq!(stats["doneCount"], 5);
}

#[tokio::test]
async fn test_health_reports_job_counts() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let track_id = client.upload_track(TEST_UPLOAD_NAME, test_wav()).await;
    let job_id = client.generate_job(&default_generate_body(&track_id)).await;
    client.wait_for_job(&job_id).await;

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["stats"]["totalTracks"], 1);
    assert_eq!(body["stats"]["totalJobs"], 1);
    assert_eq!(body["stats"]["doneCount"], 1);
}
