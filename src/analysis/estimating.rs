use super::{AnalysisError, AnalysisHints, AnalysisResult, Analyzer, Confidence};
use crate::studio_store::{Scale, Track};
use async_trait::async_trait;
use rand::Rng;

const KEYS: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];

/// Placeholder analyzer producing plausible values without looking at the
/// audio. Hinted values pass through untouched.
#[derive(Debug, Default)]
pub struct EstimatingAnalyzer;

impl EstimatingAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn estimate(hints: &AnalysisHints) -> AnalysisResult {
        let mut rng = rand::rng();
        let bpm = hints
            .bpm
            .unwrap_or_else(|| rng.random_range(90..150) as f64);
        let key = hints
            .key
            .clone()
            .unwrap_or_else(|| KEYS[rng.random_range(0..KEYS.len())].to_string());
        let scale = hints.scale.unwrap_or_else(|| {
            if rng.random_bool(0.5) {
                Scale::Major
            } else {
                Scale::Minor
            }
        });

        AnalysisResult {
            bpm,
            key,
            scale,
            confidence: Confidence {
                bpm: rng.random_range(0.7..1.0),
                key: rng.random_range(0.6..1.0),
            },
        }
    }
}

#[async_trait]
impl Analyzer for EstimatingAnalyzer {
    async fn analyze(
        &self,
        _track: &Track,
        hints: &AnalysisHints,
    ) -> Result<AnalysisResult, AnalysisError> {
        Ok(Self::estimate(hints))
    }
}
