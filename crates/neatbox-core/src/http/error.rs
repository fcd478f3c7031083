//! # Neatbox HTTP Errors
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid request method '{method}'")]
    InvalidMethod { method: String },

    #[error("Invalid request URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Failed to read the request body: {0}")]
    BodyRead(#[source] std::io::Error),

    #[error("Failed to move uploaded file '{name}' to '{}': {source}", target.display())]
    UploadMove {
        name: String,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Uploaded file '{name}' is not valid (error code {code})")]
    InvalidUpload { name: String, code: u32 },

    #[error("Failed to encode response content as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
