use std::path::PathBuf;
use thiserror::Error;

/// Required input is missing or cannot be read.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("transcript file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read transcript {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcript {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
