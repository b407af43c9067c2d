//! Musical analysis of uploaded tracks (tempo, key, scale).

mod estimating;
mod script;

pub use estimating::EstimatingAnalyzer;
pub use script::ScriptAnalyzer;

use crate::studio_store::{Scale, StoreError, StudioStore, Track, TrackUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Analysis script failed: {0}")]
    ScriptFailed(String),

    #[error("Unreadable analysis output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Values the caller already knows. Analyzers keep them as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisHints {
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<Scale>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub bpm: f64,
    pub key: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub bpm: f64,
    pub key: String,
    pub scale: Scale,
    pub confidence: Confidence,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        track: &Track,
        hints: &AnalysisHints,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Body of an analysis request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub track_id: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub scale: Option<Scale>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub track_id: String,
    pub bpm: f64,
    pub key: String,
    pub scale: Scale,
    pub confidence: Confidence,
}

/// Runs an analyzer against a stored track and writes the result back.
pub struct AnalysisService {
    store: Arc<dyn StudioStore>,
    analyzer: Arc<dyn Analyzer>,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn StudioStore>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { store, analyzer }
    }

    pub async fn analyze(
        &self,
        track_id: &str,
        hints: AnalysisHints,
    ) -> Result<AnalyzeResponse, AnalysisError> {
        let track = self.store.get_track(track_id).map_err(|e| match e {
            StoreError::TrackNotFound(id) => AnalysisError::TrackNotFound(id),
            other => other.into(),
        })?;

        let result = self.analyzer.analyze(&track, &hints).await?;

        // The track may have been deleted while we were analyzing.
        self.store
            .update_track(
                track_id,
                TrackUpdate {
                    bpm: Some(result.bpm),
                    key: Some(result.key.clone()),
                    scale: Some(result.scale),
                },
            )
            .map_err(|e| match e {
                StoreError::TrackNotFound(id) => AnalysisError::TrackNotFound(id),
                other => other.into(),
            })?;
        info!(
            "Analyzed track {}: {} bpm, {} {}",
            track_id, result.bpm, result.key, result.scale
        );

        Ok(AnalyzeResponse {
            track_id: track_id.to_string(),
            bpm: result.bpm,
            key: result.key,
            scale: result.scale,
            confidence: result.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio_store::InMemoryStudioStore;
    use std::path::PathBuf;

    fn service() -> (AnalysisService, Arc<dyn StudioStore>, String) {
        let store: Arc<dyn StudioStore> = Arc::new(InMemoryStudioStore::new());
        let track = Track::new("take1.wav", 12.0, PathBuf::from("take1.wav"));
        let track_id = track.track_id.clone();
        store.create_track(track).unwrap();
        let service = AnalysisService::new(store.clone(), Arc::new(EstimatingAnalyzer::new()));
        (service, store, track_id)
    }

    #[tokio::test]
    async fn results_are_written_to_the_track() {
        let (service, store, track_id) = service();

        let response = service
            .analyze(
                &track_id,
                AnalysisHints {
                    bpm: Some(128.0),
                    key: None,
                    scale: Some(Scale::Minor),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.bpm, 128.0);
        assert_eq!(response.scale, Scale::Minor);
        let track = store.get_track(&track_id).unwrap();
        assert_eq!(track.bpm, Some(128.0));
        assert_eq!(track.key, Some(response.key));
        assert_eq!(track.scale, Some(Scale::Minor));
    }

    #[tokio::test]
    async fn unknown_track() {
        let (service, _, _) = service();
        let result = service.analyze("nope", AnalysisHints::default()).await;
        assert!(matches!(result, Err(AnalysisError::TrackNotFound(_))));
    }

    #[test]
    fn response_serializes_camel_case() {
        let response = AnalyzeResponse {
            track_id: "t".to_string(),
            bpm: 120.0,
            key: "D".to_string(),
            scale: Scale::Major,
            confidence: Confidence { bpm: 0.9, key: 0.8 },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["trackId"], "t");
        assert_eq!(json["scale"], "major");
        assert_eq!(json["confidence"]["key"], 0.8);
    }
}
