//! JSON endpoints for generation, job/track status and analysis.

use super::api_error::ApiError;
use super::state::*;
use crate::analysis::{AnalysisHints, AnalyzeRequest, AnalyzeResponse};
use crate::generation::{GenerateRequest, GenerateResponse};
use crate::status::{JobView, TrackView};
use crate::studio_store::StoreStats;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    timestamp: DateTime<Utc>,
    stats: StoreStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStats {
    #[serde(flatten)]
    stats: StoreStats,
    running_jobs: usize,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn health(State(status): State<GuardedStatusService>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        stats: status.stats(),
    })
}

async fn admin_stats(State(state): State<ServerState>) -> Json<AdminStats> {
    Json(AdminStats {
        stats: state.status.stats(),
        running_jobs: state.generation.pool().running_count().await,
    })
}

async fn generate(
    State(generation): State<GuardedGenerationManager>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request = json_body(payload)?;
    Ok(Json(generation.generate(request).await?))
}

async fn get_job(
    State(status): State<GuardedStatusService>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    Ok(Json(status.get_job(&job_id)?))
}

async fn get_track(
    State(status): State<GuardedStatusService>,
    Path(track_id): Path<String>,
) -> Result<Json<TrackView>, ApiError> {
    Ok(Json(status.get_track(&track_id)?))
}

async fn delete_track(
    State(status): State<GuardedStatusService>,
    Path(track_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    status.delete_track(&track_id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn list_tracks(State(status): State<GuardedStatusService>) -> Json<Vec<TrackView>> {
    Json(status.list_tracks())
}

async fn analyze(
    State(analysis): State<GuardedAnalysisService>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request = json_body(payload)?;
    let track_id = request
        .track_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Track ID is required"))?;

    let hints = AnalysisHints {
        bpm: request.bpm,
        key: request.key,
        scale: request.scale,
    };
    Ok(Json(analysis.analyze(&track_id, hints).await?))
}

pub fn make_studio_routes(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/stats", get(admin_stats))
        .route("/generate", post(generate))
        .route("/analyze", post(analyze))
        .route("/job/{job_id}", get(get_job))
        .route("/track/{track_id}", get(get_track).delete(delete_track))
        .route("/tracks", get(list_tracks))
        .with_state(state)
}
