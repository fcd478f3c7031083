//! # Neatbox Event System
//!
//! Synchronous publish/subscribe bus used by the kernel to expose the
//! request lifecycle (`kernel.request`, `kernel.route`, `kernel.no_response`,
//! `kernel.response`, `kernel.exception`).
//!
//! Events are plain structs implementing [`Event`]. Lifecycle events carry
//! an optional result slot (a response or a replacement route); the
//! [`EventDispatcher`] stops calling listeners as soon as one of them fills
//! that slot, or returns [`EventResult::Stop`].
pub mod dispatcher;
pub mod error;
pub mod types;

use std::any::Any;
use std::fmt;

/// Identifier handed out when a listener is registered.
pub type ListenerId = u64;

/// Listener priority. Higher values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EventPriority {
    /// Processed last
    Low,
    /// The default
    #[default]
    Normal,
    /// Processed before normal listeners
    High,
    /// Processed before everything else (firewalls)
    Critical,
}

impl From<EventPriority> for i32 {
    fn from(priority: EventPriority) -> Self {
        match priority {
            EventPriority::Low => -10,
            EventPriority::Normal => 0,
            EventPriority::High => 10,
            EventPriority::Critical => 100,
        }
    }
}

/// Result of a single listener call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Keep calling the remaining listeners
    Continue,
    /// Stop propagation
    Stop,
}

/// Core event trait
pub trait Event: Any + fmt::Debug {
    /// Get the name of this event
    fn name(&self) -> &'static str;

    /// Whether a listener has filled the event's result slot.
    fn has_result(&self) -> bool {
        false
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Cast to mutable Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub use dispatcher::EventDispatcher;
pub use types::{ExceptionEvent, NoResponseEvent, RequestEvent, ResponseEvent, RouteEvent};

// Test module declaration
#[cfg(test)]
mod tests;
