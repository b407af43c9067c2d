//! Upload intake and audio file serving.

use super::api_error::ApiError;
use super::state::*;
use crate::artifacts::is_artifact_file_name;
use crate::intake::{is_plain_file_name, AudioFormat, UploadResponse};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::debug;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

fn audio_response(bytes: Vec<u8>, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Body::from(bytes),
    )
        .into_response()
}

async fn upload(
    State(intake): State<GuardedUploadIntake>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        debug!("Received upload {} ({} bytes)", filename, data.len());

        return Ok(Json(intake.ingest(&filename, &data).await?));
    }
    Err(ApiError::bad_request("No file provided"))
}

async fn get_artifact(
    State(state): State<ServerState>,
    Path((job_id, artifact)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    state.store.get_job(&job_id)?;
    if !is_artifact_file_name(&artifact) {
        return Err(ApiError::not_found("Artifact not found"));
    }
    match state
        .artifacts
        .read(&job_id, &artifact)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read artifact: {:#}", e)))?
    {
        Some(bytes) => Ok(audio_response(bytes, "audio/wav")),
        None => Err(ApiError::not_found("Artifact not found")),
    }
}

async fn get_file(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = state.intake.resolve_upload(&filename).or_else(|| {
        state
            .config
            .output_dir
            .as_ref()
            .map(|dir| dir.join(&filename))
            .filter(|path| path.is_file())
    });
    let path = path.ok_or_else(|| ApiError::not_found("File not found"))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to serve file: {}", e)))?;
    Ok(audio_response(bytes, AudioFormat::mime_for_path(&path)))
}

pub fn make_media_routes(state: ServerState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/job/{job_id}/{artifact}", get(get_artifact))
        .route("/files/{filename}", get(get_file))
        .with_state(state)
}
