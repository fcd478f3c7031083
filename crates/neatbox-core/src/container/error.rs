//! # Neatbox Service Container Errors
//!
//! Errors raised while registering, resolving or downcasting services.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Circular reference detected while creating service '{name}'")]
    CircularReference { name: String },

    #[error("Service '{name}' is not of the requested type '{expected}'")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Required service '{name}' is not registered")]
    ServiceNotFound { name: String },

    #[error("Argument {index} of service '{name}' is missing or has the wrong type")]
    InvalidArgument { name: String, index: usize },

    #[error("Model '{name}' could not be created: {reason}")]
    ModelCreationFailed { name: String, reason: String },

    #[error("The service container was dropped while a handle to it was still in use")]
    ContainerDropped,
}
