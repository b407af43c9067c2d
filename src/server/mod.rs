mod api_error;
pub mod config;
mod http_layers;
mod media_routes;
pub mod metrics;
pub mod server;
pub mod state;
mod studio_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
