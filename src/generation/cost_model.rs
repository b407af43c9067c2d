//! Time cost of a synthesis run and the workload that spends it.

use crate::studio_store::InstrumentConfig;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Linear cost model for a generation job:
/// `base + enabled * unit * (avg_complexity / baseline)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub base_ms: f64,
    pub unit_ms: f64,
    pub baseline_complexity: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            base_ms: 2000.0,
            unit_ms: 1000.0,
            baseline_complexity: 3.0,
        }
    }
}

impl CostModel {
    /// Estimated duration in milliseconds. Disabled instruments don't count.
    pub fn estimate_ms(&self, instruments: &[InstrumentConfig]) -> f64 {
        let complexities: Vec<f64> = instruments
            .iter()
            .filter(|i| i.enabled)
            .map(|i| i.effective_complexity() as f64)
            .collect();

        if complexities.is_empty() {
            return self.base_ms;
        }

        let enabled = complexities.len() as f64;
        let avg = complexities.iter().sum::<f64>() / enabled;
        self.base_ms + enabled * self.unit_ms * (avg / self.baseline_complexity)
    }

    /// The estimate as a `Duration`, saturating instead of overflowing.
    pub fn estimate(&self, instruments: &[InstrumentConfig]) -> Duration {
        saturating_secs(self.estimate_ms(instruments) / 1000.0)
    }
}

fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// The opaque synthesis step. Implementations spend (or pretend to spend)
/// the estimated time.
#[async_trait]
pub trait Workload: Send + Sync {
    async fn run(&self, job_id: &str, estimate: Duration) -> anyhow::Result<()>;
}

/// Sleeps for the estimate multiplied by `time_scale`.
pub struct SimulatedWorkload {
    time_scale: f64,
}

impl SimulatedWorkload {
    pub fn new(time_scale: f64) -> Self {
        Self {
            time_scale: if time_scale.is_finite() {
                time_scale.max(0.0)
            } else {
                0.0
            },
        }
    }
}

#[async_trait]
impl Workload for SimulatedWorkload {
    async fn run(&self, _job_id: &str, estimate: Duration) -> anyhow::Result<()> {
        tokio::time::sleep(saturating_secs(estimate.as_secs_f64() * self.time_scale)).await;
        Ok(())
    }
}

/// Completes immediately, remembering the estimates it was handed.
#[derive(Default)]
pub struct InstantWorkload {
    seen: Mutex<Vec<(String, Duration)>>,
}

impl InstantWorkload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<(String, Duration)> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Workload for InstantWorkload {
    async fn run(&self, job_id: &str, estimate: Duration) -> anyhow::Result<()> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((job_id.to_string(), estimate));
        Ok(())
    }
}
