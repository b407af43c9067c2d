pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod generation;
pub mod intake;
pub mod server;
pub mod status;
pub mod studio;
pub mod studio_store;
pub mod wav;

pub use server::{run_server, RequestsLoggingLevel};
pub use studio::{Studio, StudioParts};
