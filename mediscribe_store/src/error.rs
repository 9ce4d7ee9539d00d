use std::path::PathBuf;
use thiserror::Error;

/// Durable storage could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read record store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but does not hold a record array.
    #[error("record store {path} is unreadable as JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write record store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record store lock poisoned")]
    LockPoisoned,
}
