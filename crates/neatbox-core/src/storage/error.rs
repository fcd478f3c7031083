//! # Neatbox Storage System Errors
//!
//! Errors raised while reading configuration resources and working with
//! cache backends. The [`io`](StorageSystemError::io) helper keeps the path
//! of the failed operation attached to I/O errors.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found at path: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Invalid configuration in '{}': {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("Circular configuration import of '{}'", path.display())]
    CircularImport { path: PathBuf },
}

// Helper for creating Io errors, ensuring path is always included.
impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
