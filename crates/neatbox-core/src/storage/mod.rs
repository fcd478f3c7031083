//! # Neatbox Storage
//!
//! Configuration loading ([`ConfigSettings`]) and the cache backends
//! registered as the `cache` service.
pub mod cache;
pub mod config;
pub mod error;

/// Re-export key types
pub use cache::{Cache, MemoryCache, NullCache};
pub use config::{ConfigFormat, ConfigSettings};
