//! # Neatbox Routing Errors
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Route '{route}' has an invalid pattern: {reason}")]
    InvalidPattern { route: String, reason: String },

    #[error("Route '{route}' has an invalid controller '{controller}', expected 'package:Controller:action'")]
    InvalidController { route: String, controller: String },
}
