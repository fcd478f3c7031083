//! # Neatbox Service Container
//!
//! A named registry of services. Services are registered either as ready
//! instances or as [`ServiceDefinition`]s, which are turned into instances
//! the first time somebody asks for them.
//!
//! The container is built for the one-request-per-process model: it lives in
//! an `Rc`, uses interior mutability, and is not `Send`. The only guard
//! against re-entrancy is the per-definition "creating" flag, which turns a
//! dependency cycle into a [`ContainerError::CircularReference`] instead of
//! unbounded recursion.
pub mod definition;
pub mod error;

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use regex::Regex;

use crate::kernel::error::{Error, Result};

pub use definition::{Argument, Arguments, ResolvedArgument, ServiceDefinition};
pub use error::ContainerError;

/// A resolved service instance as stored in the container.
pub type Service = Rc<dyn Any>;

/// Implemented by anything that wants a handle to the container injected
/// after construction (services, controllers, models, packages).
pub trait ContainerAware {
    fn set_container(&mut self, container: ContainerHandle);
}

/// A model is a multi-instance object built by the container on demand.
pub trait Model: Any {
    /// Returns the container-aware view of this model, if it has one.
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        None
    }

    /// Called once, after the container was injected.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Weak handle to a container.
///
/// Services keep a handle rather than an `Rc` so the container and the
/// services it owns do not keep each other alive.
#[derive(Clone, Default)]
pub struct ContainerHandle(Weak<ServiceContainer>);

impl ContainerHandle {
    /// Get the container, failing if it has already been dropped.
    pub fn upgrade(&self) -> Result<Rc<ServiceContainer>> {
        self.0.upgrade().ok_or_else(|| ContainerError::ContainerDropped.into())
    }

    /// Whether the handle points at a live container.
    pub fn is_attached(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Typed lookup through the handle. See [`ServiceContainer::get`].
    pub fn get<T: Any>(&self, name: &str) -> Result<Option<Rc<T>>> {
        self.upgrade()?.get::<T>(name)
    }

    /// Typed lookup that treats an absent service as an error.
    pub fn require<T: Any>(&self, name: &str) -> Result<Rc<T>> {
        self.upgrade()?.require::<T>(name)
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

enum Entry {
    Instance(Service),
    Definition(Rc<ServiceDefinition>),
}

type ModelFactory = Rc<dyn Fn(ContainerHandle) -> Result<Box<dyn Any>>>;

/// Service container holding named services and models.
pub struct ServiceContainer {
    this: Weak<ServiceContainer>,
    services: RefCell<HashMap<String, Entry>>,
    // Registration order, used by wildcard enumeration
    order: RefCell<Vec<String>>,
    models: RefCell<HashMap<String, ModelFactory>>,
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.order.borrow())
            .field("models_count", &self.models.borrow().len())
            .finish()
    }
}

impl ServiceContainer {
    /// Create an empty container.
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            services: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            models: RefCell::new(HashMap::new()),
        })
    }

    /// A weak handle to this container, for injection into container-aware objects.
    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle(self.this.clone())
    }

    /// Register a lazily created service. Replaces any existing entry with the same name.
    pub fn register(&self, definition: ServiceDefinition) {
        let name = definition.name().to_string();
        log::debug!("Registering service definition '{}'", name);
        self.insert(name, Entry::Definition(Rc::new(definition)));
    }

    /// Register a ready instance under `name`.
    pub fn set<T: Any>(&self, name: &str, instance: Rc<T>) {
        self.set_service(name, instance);
    }

    /// Register an already type-erased instance under `name`.
    pub fn set_service(&self, name: &str, service: Service) {
        log::debug!("Registering service instance '{}'", name);
        self.insert(name.to_string(), Entry::Instance(service));
    }

    fn insert(&self, name: String, entry: Entry) {
        let previous = self.services.borrow_mut().insert(name.clone(), entry);
        if previous.is_none() {
            self.order.borrow_mut().push(name);
        }
    }

    /// Drop the named service. Returns whether anything was registered.
    pub fn remove(&self, name: &str) -> bool {
        if self.services.borrow_mut().remove(name).is_none() {
            return false;
        }
        log::debug!("Removed service '{}'", name);
        self.order.borrow_mut().retain(|existing| existing != name);
        true
    }

    /// Whether a service (resolved or not) is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.services.borrow().contains_key(name)
    }

    /// Names of all registered services in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.borrow().clone()
    }

    /// Whether the named service has already been turned into an instance.
    pub fn is_resolved(&self, name: &str) -> bool {
        matches!(self.services.borrow().get(name), Some(Entry::Instance(_)))
    }

    /// Get the named service, creating it if needed.
    ///
    /// Returns `Ok(None)` for an unknown name. Fails with
    /// [`ContainerError::CircularReference`] when called for a service whose
    /// creation is already in progress further up the call stack.
    pub fn get_service(&self, name: &str) -> Result<Option<Service>> {
        // Release the borrow before running any factory, factories call back into us
        let definition = match self.services.borrow().get(name) {
            None => return Ok(None),
            Some(Entry::Instance(instance)) => return Ok(Some(instance.clone())),
            Some(Entry::Definition(definition)) => definition.clone(),
        };

        if definition.is_creating() {
            log::error!("Circular reference detected while creating service '{}'", name);
            return Err(ContainerError::CircularReference { name: name.to_string() }.into());
        }

        definition.set_creating(true);
        let created = definition.create(self);
        definition.set_creating(false);
        let instance = created?;

        if definition.is_shared() {
            let mut services = self.services.borrow_mut();
            // Only replace the entry if it still holds this definition
            let unchanged = matches!(
                services.get(name),
                Some(Entry::Definition(current)) if Rc::ptr_eq(current, &definition)
            );
            if unchanged {
                services.insert(name.to_string(), Entry::Instance(instance.clone()));
            }
        }

        log::debug!("Created service '{}'", name);
        Ok(Some(instance))
    }

    /// Typed version of [`get_service`](Self::get_service).
    pub fn get<T: Any>(&self, name: &str) -> Result<Option<Rc<T>>> {
        match self.get_service(name)? {
            None => Ok(None),
            Some(service) => service.downcast::<T>().map(Some).map_err(|_| {
                Error::from(ContainerError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_name::<T>(),
                })
            }),
        }
    }

    /// Typed lookup that treats an absent service as an error.
    pub fn require<T: Any>(&self, name: &str) -> Result<Rc<T>> {
        self.get::<T>(name)?
            .ok_or_else(|| ContainerError::ServiceNotFound { name: name.to_string() }.into())
    }

    /// Resolve every service whose name matches a wildcard pattern, e.g.
    /// `twig.extension.*`. A `*` stands for one or more characters other
    /// than `.` and the whole name has to match. Services are returned in
    /// registration order. A pattern without `*` is a plain [`get_service`](Self::get_service).
    pub fn get_matching(&self, pattern: &str) -> Result<Vec<Service>> {
        if !pattern.contains('*') {
            return Ok(self.get_service(pattern)?.into_iter().collect());
        }

        let source = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("[^.]+");
        let matcher = Regex::new(&format!("^{}$", source))
            .map_err(|e| Error::Other(format!("Invalid service pattern '{}': {}", pattern, e)))?;

        let names: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| matcher.is_match(name))
            .collect();

        let mut matching = Vec::with_capacity(names.len());
        for name in names {
            if let Some(service) = self.get_service(&name)? {
                matching.push(service);
            }
        }
        Ok(matching)
    }

    /// Typed version of [`get_matching`](Self::get_matching). Services of another type are skipped.
    pub fn get_matching_as<T: Any>(&self, pattern: &str) -> Result<Vec<Rc<T>>> {
        Ok(self
            .get_matching(pattern)?
            .into_iter()
            .filter_map(|service| service.downcast::<T>().ok())
            .collect())
    }

    /// Register a model factory. Models are never cached.
    pub fn register_model<T, F>(&self, name: &str, factory: F)
    where
        T: Model,
        F: Fn() -> T + 'static,
    {
        let model_name = name.to_string();
        let build: ModelFactory = Rc::new(move |container: ContainerHandle| {
            let mut model = factory();
            if let Some(aware) = model.container_aware() {
                aware.set_container(container);
            }
            model.init().map_err(|e| ContainerError::ModelCreationFailed {
                name: model_name.clone(),
                reason: e.to_string(),
            })?;
            Ok(Box::new(model) as Box<dyn Any>)
        });
        self.models.borrow_mut().insert(name.to_string(), build);
    }

    /// Whether a model factory is registered under `name`.
    pub fn has_model(&self, name: &str) -> bool {
        self.models.borrow().contains_key(name)
    }

    /// Build a fresh instance of the named model. Unknown models yield `Ok(None)`.
    pub fn create_model<T: Model>(&self, name: &str) -> Result<Option<T>> {
        let factory = match self.models.borrow().get(name) {
            Some(factory) => factory.clone(),
            None => return Ok(None),
        };

        let model = factory(self.handle())?;
        model.downcast::<T>().map(|model| Some(*model)).map_err(|_| {
            ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            }
            .into()
        })
    }
}
