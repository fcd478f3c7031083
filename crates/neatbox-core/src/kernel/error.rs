//! # Neatbox Kernel Errors
//!
//! Defines the crate-wide [`Error`] type and the `Result` alias used by every
//! subsystem.
//!
//! Each subsystem (container, routing, events, storage, http) has its own typed
//! error enum which is wrapped here through `#[from]`, so `?` works across
//! module boundaries. The variants defined directly on [`Error`] are the
//! fatal conditions of the request pipeline: unresolvable resources,
//! unmatched pages and controller contract violations.
use std::path::PathBuf;
use std::result::Result as StdResult;

use crate::container::error::ContainerError;
use crate::event::error::EventSystemError;
use crate::http::error::HttpError;
use crate::routing::error::RoutingError;
use crate::storage::error::StorageSystemError;
use thiserror::Error as ThisError;

/// Custom error type for the neatbox kernel
#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed service container error
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Specific, typed routing error
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Specific, typed event system error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Specific, typed storage system error (config files, caches)
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Request building, uploads and response encoding
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// A `package:group:file` resource could not be turned into an existing file.
    #[error("Unable to find {kind} resource '{name}' (package '{package}', tried '{}')", path.display())]
    ResourceNotFound {
        name: String,
        kind: String,
        package: String,
        path: PathBuf,
    },

    /// No route matched the request and no `404` route is registered.
    #[error("Could not find a matching route, or a 404 route, for '{path}'")]
    PageNotFound { path: String },

    /// The route names a controller that no package registered.
    #[error("Controller '{controller}' is not registered")]
    ControllerNotFound { controller: String },

    /// The action ran but produced something other than a response, and no
    /// listener supplied one.
    #[error("Controller '{controller}' action '{action}' did not return a response")]
    ControllerContract { controller: String, action: String },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Boot")]
    Boot,
    #[error("Dispatch")]
    Dispatch,
    #[error("PostProcess")]
    PostProcess,
}

impl Error {
    /// Wrap a failure that happened while the kernel was in `phase`.
    pub fn lifecycle(phase: KernelLifecyclePhase, message: impl Into<String>, source: Option<Error>) -> Self {
        Error::KernelLifecycleError {
            phase,
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    /// True for the "page not found" condition, so outer layers can pick a 404 status.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PageNotFound { .. })
    }
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;
