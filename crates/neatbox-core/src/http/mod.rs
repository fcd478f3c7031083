//! # Neatbox HTTP
//!
//! [`Request`] and [`Response`] plus the pieces they are made of: parameter
//! bags, uploaded files, cookies and session storage.
pub mod cookie;
pub mod error;
pub mod params;
pub mod request;
pub mod response;
pub mod session;

pub use cookie::Cookie;
pub use error::HttpError;
pub use params::{RequestFiles, RequestHeaders, RequestParams, UploadedFile};
pub use request::Request;
pub use response::{CachePolicy, Response};
pub use session::{MemorySession, NullSession, SessionStorage, SharedSession};

// Test module declaration
#[cfg(test)]
mod tests;
