//! Track and job repository.

mod memory_store;
mod models;
mod trait_def;

pub use memory_store::InMemoryStudioStore;
pub use models::*;
pub use trait_def::{StoreError, StudioStore};
