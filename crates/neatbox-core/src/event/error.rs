//! # Neatbox Event System Errors
//!
//! Errors raised by the [`EventDispatcher`](crate::event::EventDispatcher)
//! itself. Failures inside listeners are propagated unchanged.
use crate::event::ListenerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Failed to remove event listener with ID {id}: no such listener")]
    ListenerNotFound { id: ListenerId },

    #[error("Invalid event data for event '{event_name}': {details}")]
    InvalidEventData { event_name: String, details: String },
}
