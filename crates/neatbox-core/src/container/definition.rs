//! Service definitions: the recipe the container follows to build a service
//! the first time it is requested.
use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ContainerAware, ContainerError, ContainerHandle, Service, ServiceContainer};
use crate::kernel::constants::CONFIG_SERVICE;
use crate::kernel::error::Result;
use crate::storage::ConfigSettings;

/// A constructor argument as written in the definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Passed as-is.
    Literal(Value),
    /// Looked up in the `config` service under the given key (`%key%` style).
    Config(String),
    /// Another service, looked up by name (`@name` style).
    Service(String),
}

impl Argument {
    pub fn literal(value: impl Into<Value>) -> Self {
        Argument::Literal(value.into())
    }

    pub fn config(key: impl Into<String>) -> Self {
        Argument::Config(key.into())
    }

    pub fn service(name: impl Into<String>) -> Self {
        Argument::Service(name.into())
    }
}

/// An argument after resolution.
#[derive(Clone)]
pub enum ResolvedArgument {
    Value(Value),
    /// `None` when the referenced service does not exist.
    Service(Option<Service>),
}

impl fmt::Debug for ResolvedArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedArgument::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ResolvedArgument::Service(s) => f.debug_tuple("Service").field(&s.is_some()).finish(),
        }
    }
}

/// Resolved arguments handed to factories and setup calls.
#[derive(Debug, Clone)]
pub struct Arguments {
    owner: String,
    values: Vec<ResolvedArgument>,
}

impl Arguments {
    pub fn new(owner: impl Into<String>, values: Vec<ResolvedArgument>) -> Self {
        Self { owner: owner.into(), values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&ResolvedArgument> {
        self.values.get(index)
    }

    /// Plain value at `index`. Service arguments and missing positions read as `Null`.
    pub fn value(&self, index: usize) -> &Value {
        match self.values.get(index) {
            Some(ResolvedArgument::Value(value)) => value,
            _ => &Value::Null,
        }
    }

    /// String value at `index`, if there is one.
    pub fn string(&self, index: usize) -> Option<&str> {
        self.value(index).as_str()
    }

    /// Deserialize the value at `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        serde_json::from_value(self.value(index).clone()).map_err(|_| self.invalid(index))
    }

    /// Service at `index`, `Ok(None)` if the referenced service does not exist.
    pub fn service<T: Any>(&self, index: usize) -> Result<Option<Rc<T>>> {
        match self.values.get(index) {
            Some(ResolvedArgument::Service(None)) => Ok(None),
            Some(ResolvedArgument::Service(Some(service))) => service
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| {
                    ContainerError::TypeMismatch {
                        name: format!("{}#{}", self.owner, index),
                        expected: type_name::<T>(),
                    }
                    .into()
                }),
            _ => Err(self.invalid(index)),
        }
    }

    fn invalid(&self, index: usize) -> crate::kernel::error::Error {
        ContainerError::InvalidArgument { name: self.owner.clone(), index }.into()
    }
}

type Factory = Rc<dyn Fn(&Arguments, ContainerHandle) -> Result<Service>>;
type SetupStep = Rc<dyn Fn(&dyn Any, &Arguments) -> Option<Result<()>>>;

enum Reference {
    Instance(Service),
    Factory(Factory),
}

struct SetupCall {
    method: String,
    arguments: Vec<Argument>,
    step: SetupStep,
}

struct ResolvedSet {
    arguments: Arguments,
    calls: Vec<Arguments>,
}

/// Describes how to build one service.
pub struct ServiceDefinition {
    name: String,
    reference: RefCell<Reference>,
    arguments: Vec<Argument>,
    calls: Vec<SetupCall>,
    resolved: RefCell<Option<ResolvedSet>>,
    creating: Cell<bool>,
    shared: bool,
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("calls", &self.calls.iter().map(|c| c.method.as_str()).collect::<Vec<_>>())
            .field("shared", &self.shared)
            .field("creating", &self.creating.get())
            .finish()
    }
}

impl ServiceDefinition {
    fn with_reference(name: impl Into<String>, reference: Reference) -> Self {
        Self {
            name: name.into(),
            reference: RefCell::new(reference),
            arguments: Vec::new(),
            calls: Vec::new(),
            resolved: RefCell::new(None),
            creating: Cell::new(false),
            shared: true,
        }
    }

    /// A definition wrapping an existing instance. Arguments are ignored.
    pub fn instance<T: Any>(name: impl Into<String>, instance: Rc<T>) -> Self {
        Self::with_reference(name, Reference::Instance(instance))
    }

    /// A definition built by calling `factory` with the resolved arguments.
    pub fn new<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Any,
        F: Fn(&Arguments) -> Result<T> + 'static,
    {
        let factory: Factory = Rc::new(move |args: &Arguments, _container: ContainerHandle| {
            Ok(Rc::new(factory(args)?) as Service)
        });
        Self::with_reference(name, Reference::Factory(factory))
    }

    /// Like [`new`](Self::new), but the container handle is injected into the
    /// built object before it is shared.
    pub fn container_aware<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: ContainerAware + Any,
        F: Fn(&Arguments) -> Result<T> + 'static,
    {
        let factory: Factory = Rc::new(move |args: &Arguments, container: ContainerHandle| {
            let mut instance = factory(args)?;
            instance.set_container(container);
            Ok(Rc::new(instance) as Service)
        });
        Self::with_reference(name, Reference::Factory(factory))
    }

    /// Constructor arguments, resolved in order on first creation.
    pub fn with_arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Add a setup call run on the new instance after construction.
    ///
    /// Calls run in the order they were added. A call whose target type does
    /// not match the built instance is skipped.
    pub fn add_call<T, F>(mut self, method: impl Into<String>, arguments: Vec<Argument>, call: F) -> Self
    where
        T: Any,
        F: Fn(&T, &Arguments) -> Result<()> + 'static,
    {
        let step: SetupStep = Rc::new(move |instance: &dyn Any, args: &Arguments| {
            instance.downcast_ref::<T>().map(|target| call(target, args))
        });
        self.calls.push(SetupCall { method: method.into(), arguments, step });
        self
    }

    /// Build a new instance on every request instead of caching the first one.
    pub fn multi_instance(mut self) -> Self {
        self.shared = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_creating(&self) -> bool {
        self.creating.get()
    }

    pub(crate) fn set_creating(&self, creating: bool) {
        self.creating.set(creating);
    }

    /// Build (or return the cached) instance.
    ///
    /// Arguments and setup-call arguments are resolved once and reused by
    /// later creations of a multi-instance service.
    pub fn create(&self, container: &ServiceContainer) -> Result<Service> {
        let factory = match &*self.reference.borrow() {
            Reference::Instance(instance) => return Ok(instance.clone()),
            Reference::Factory(factory) => factory.clone(),
        };

        self.resolve(container)?;
        let resolved = self.resolved.borrow();
        let Some(resolved) = resolved.as_ref() else {
            return Err(ContainerError::InvalidArgument { name: self.name.clone(), index: 0 }.into());
        };

        let instance = factory(&resolved.arguments, container.handle())?;

        for (call, args) in self.calls.iter().zip(resolved.calls.iter()) {
            match (call.step)(instance.as_ref(), args) {
                Some(result) => result?,
                None => log::debug!(
                    "Skipping setup call '{}' on service '{}': instance type does not match",
                    call.method,
                    self.name
                ),
            }
        }

        if self.shared {
            *self.reference.borrow_mut() = Reference::Instance(instance.clone());
        }

        Ok(instance)
    }

    fn resolve(&self, container: &ServiceContainer) -> Result<()> {
        if self.resolved.borrow().is_some() {
            return Ok(());
        }

        let arguments = Arguments::new(self.name.clone(), resolve_all(&self.arguments, container)?);
        let mut calls = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            let owner = format!("{}::{}", self.name, call.method);
            calls.push(Arguments::new(owner, resolve_all(&call.arguments, container)?));
        }

        *self.resolved.borrow_mut() = Some(ResolvedSet { arguments, calls });
        Ok(())
    }
}

fn resolve_all(arguments: &[Argument], container: &ServiceContainer) -> Result<Vec<ResolvedArgument>> {
    arguments.iter().map(|arg| resolve_one(arg, container)).collect()
}

fn resolve_one(argument: &Argument, container: &ServiceContainer) -> Result<ResolvedArgument> {
    Ok(match argument {
        Argument::Literal(value) => ResolvedArgument::Value(value.clone()),
        Argument::Service(name) => ResolvedArgument::Service(container.get_service(name)?),
        Argument::Config(key) => {
            let value = container
                .get::<ConfigSettings>(CONFIG_SERVICE)?
                .and_then(|config| config.get(key).cloned())
                .unwrap_or(Value::Null);
            ResolvedArgument::Value(value)
        }
    })
}
