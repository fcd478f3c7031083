//! Extension points of the kernel: the application description
//! ([`AppKernel`]), bootable [`Package`]s and the [`KernelHandle`] passed to
//! them.
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::container::{ContainerAware, ContainerHandle, ServiceContainer};
use crate::kernel::constants::DEFAULT_CONFIG_RESOURCE;
use crate::kernel::controller::ControllerRegistry;
use crate::kernel::error::Result;
use crate::kernel::resource::ResourceLocator;

/// Describes an application to the kernel.
pub trait AppKernel {
    /// Named packages and their root directories. The `app` package owns
    /// resources addressed without a package (`::config.yml`).
    fn register_packages(&self) -> Vec<(String, PathBuf)>;

    /// Packages booted once, in order, after the services are registered.
    fn bootable(&self) -> Vec<Box<dyn Package>> {
        Vec::new()
    }

    /// Register application services. Runs after the built-in services, so
    /// an application can replace them (for example `cache` or `session`).
    fn register_services(&self, _container: &ServiceContainer) -> Result<()> {
        Ok(())
    }

    /// The config resource to load for `environment`.
    fn config_name(&self, _environment: &str) -> String {
        DEFAULT_CONFIG_RESOURCE.to_string()
    }
}

/// A bootable unit of an application.
pub trait Package: fmt::Debug {
    fn name(&self) -> &str;

    /// The container-aware view of this package, if it wants the container injected.
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        None
    }

    /// Add this package's controllers to the registry.
    fn register_controllers(&self, _registry: &mut ControllerRegistry) {}

    /// Called once while the kernel boots. Listeners are usually added here.
    fn boot(&mut self, _kernel: &KernelHandle) -> Result<()> {
        Ok(())
    }
}

/// What packages, listeners and events get to see of the kernel.
#[derive(Clone, Default)]
pub struct KernelHandle {
    pub environment: String,
    pub container: ContainerHandle,
    pub locator: Rc<ResourceLocator>,
}

impl fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("environment", &self.environment)
            .field("container", &self.container)
            .field("packages", &self.locator.package_names().collect::<Vec<_>>())
            .finish()
    }
}

impl KernelHandle {
    /// See [`ResourceLocator::find_resource`].
    pub fn find_resource(&self, name: &str, kind: &str) -> Result<PathBuf> {
        self.locator.find_resource(name, kind)
    }

    /// See [`ResourceLocator::find_path`].
    pub fn find_path(&self, name: &str) -> Result<PathBuf> {
        self.locator.find_path(name)
    }
}
