// Core modules of the framework
pub mod container;
pub mod event;
pub mod http;
pub mod kernel;
pub mod logger;
pub mod routing;
pub mod storage;

// Re-export key public types/traits for easier use by the binary and applications
pub use container::{Argument, Arguments, ContainerAware, ContainerHandle, ServiceContainer, ServiceDefinition};
pub use event::{Event, EventDispatcher, EventResult};
pub use http::{Request, Response};
pub use kernel::Kernel;
pub use kernel::error::Error as KernelError;
pub use kernel::{ActionOutput, AppKernel, Controller, ControllerRegistry, Package};
pub use routing::{Route, RouteCollection};
pub use storage::ConfigSettings;

// Cross-module scenarios live in tests/integration
#[cfg(test)]
mod tests;
