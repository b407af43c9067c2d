use super::RequestsLoggingLevel;
use crate::intake::DEFAULT_MAX_UPLOAD_BYTES;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Upload size limit; request bodies are capped slightly above it.
    pub max_upload_bytes: u64,
    /// Second lookup location for `/api/files`, after the upload dir.
    pub output_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            output_dir: None,
        }
    }
}
