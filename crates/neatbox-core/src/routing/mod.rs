//! # Neatbox Routing
//!
//! A [`Route`] maps one URL pattern to a controller action and back; a
//! [`RouteCollection`] holds the application's routes in declaration order
//! and is registered as the `routes` service.
//!
//! Patterns look like `/blog/{page}/::{section}`. `{name}` is a placeholder
//! whose accepted text is chosen by its type (`int`, `slug`, `alphanum`,
//! `alpha`, `text` or a raw regex) and `::` starts an optional tail.
pub mod collection;
pub mod error;
pub mod route;

pub use collection::{RouteCollection, RouteSpec};
pub use error::RoutingError;
pub use route::Route;

// Test module declaration
#[cfg(test)]
mod tests;
