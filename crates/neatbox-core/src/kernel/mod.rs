//! # Neatbox Kernel
//!
//! The `kernel` module ties the framework together:
//!
//! - [`Kernel`](bootstrap::Kernel) boots an [`AppKernel`] into a fresh
//!   service container and runs the request pipeline
//!   (`kernel.request` → routing → `kernel.route` → controller →
//!   `kernel.no_response` → `kernel.response`, with `kernel.exception` on errors).
//! - [`component`] holds the extension points: applications, bootable
//!   [`Package`]s and the [`KernelHandle`] they receive.
//! - [`controller`] defines controllers, their registry and the
//!   [`ControllerBase`] helper.
//! - [`resource`] resolves `package:group:file` resource names.
//! - [`constants`] names the built-in services and defaults.
//! - [`error`] defines the kernel-level [`Error`] and `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod controller;
pub mod error;
pub mod resource;

pub use bootstrap::Kernel;
pub use component::{AppKernel, KernelHandle, Package};
pub use controller::{ActionOutput, Controller, ControllerBase, ControllerRegistry};
pub use error::{Error, Result};
pub use resource::ResourceLocator;
