//! Job orchestration: validating generation requests, running the synthesis
//! pipeline in the background and reporting completions.

pub mod cost_model;
mod manager;
mod models;
mod pipeline;
mod worker_pool;

pub use cost_model::{CostModel, InstantWorkload, SimulatedWorkload, Workload};
pub use manager::GenerationManager;
pub use models::{GenerateRequest, GenerateResponse, GenerationError, JobCompletion, JobOutcome};
pub use pipeline::GenerationPipeline;
pub use worker_pool::{create_worker_pool, DispatchError, WorkerPool, WorkerPoolHandle};
