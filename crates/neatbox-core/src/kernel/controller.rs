//! Controllers and the registry the kernel builds them from.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::container::{ContainerAware, ContainerHandle, Model};
use crate::http::{Request, Response};
use crate::kernel::constants::{CONFIG_SERVICE, LOGGER_SERVICE, REQUEST_SERVICE, ROUTES_SERVICE};
use crate::kernel::error::Result;
use crate::logger::Logger;
use crate::routing::RouteCollection;
use crate::storage::config::ConfigSettings;

/// What an action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    Response(Response),
    /// Anything else. The kernel offers it to `kernel.no_response` listeners.
    Value(Value),
}

impl ActionOutput {
    /// The "no result" output.
    pub fn none() -> Self {
        ActionOutput::Value(Value::Null)
    }

    pub fn is_response(&self) -> bool {
        matches!(self, ActionOutput::Response(_))
    }
}

impl From<Response> for ActionOutput {
    fn from(response: Response) -> Self {
        ActionOutput::Response(response)
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        ActionOutput::Value(value)
    }
}

/// A request handler with named actions.
///
/// A fresh controller is built for every request. Actions are called with
/// the route arguments in placeholder order.
pub trait Controller {
    /// The container-aware view of this controller, if it wants the container injected.
    fn container_aware(&mut self) -> Option<&mut dyn ContainerAware> {
        None
    }

    /// Runs after the container was injected. Returning false skips the action.
    fn init(&mut self) -> bool {
        true
    }

    fn has_action(&self, action: &str) -> bool;

    fn call_action(&mut self, action: &str, args: &[Value]) -> Result<ActionOutput>;
}

type ControllerFactory = Rc<dyn Fn() -> Box<dyn Controller>>;

/// Controller factories by id (`package::controllers::Name`).
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ControllerRegistry").field("controllers", &ids).finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller under `package::controllers::name`.
    pub fn register<C, F>(&mut self, package: &str, name: &str, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + 'static,
    {
        let id = format!("{}::controllers::{}", package, name);
        log::debug!("Registering controller '{}'", id);
        self.factories
            .insert(id, Rc::new(move || Box::new(factory()) as Box<dyn Controller>));
    }

    pub fn has(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Build a fresh controller.
    pub fn create(&self, id: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Shared plumbing for controllers: embed it, hand it out from
/// [`Controller::container_aware`] and use its accessors.
#[derive(Debug, Default, Clone)]
pub struct ControllerBase {
    container: ContainerHandle,
}

impl ContainerAware for ControllerBase {
    fn set_container(&mut self, container: ContainerHandle) {
        self.container = container;
    }
}

impl ControllerBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self) -> &ContainerHandle {
        &self.container
    }

    /// Any service by name.
    pub fn get<T: Any>(&self, name: &str) -> Result<Option<Rc<T>>> {
        self.container.get::<T>(name)
    }

    pub fn request(&self) -> Result<Rc<Request>> {
        self.container.require::<Request>(REQUEST_SERVICE)
    }

    pub fn routes(&self) -> Result<Rc<RouteCollection>> {
        self.container.require::<RouteCollection>(ROUTES_SERVICE)
    }

    pub fn logger(&self) -> Result<Rc<Logger>> {
        self.container.require::<Logger>(LOGGER_SERVICE)
    }

    pub fn config(&self) -> Result<Rc<ConfigSettings>> {
        self.container.require::<ConfigSettings>(CONFIG_SERVICE)
    }

    /// A fresh instance of a registered model.
    pub fn create_model<T: Model>(&self, name: &str) -> Result<Option<T>> {
        self.container.upgrade()?.create_model::<T>(name)
    }

    /// A redirect to the named route. An unknown route gives a plain
    /// `200` response, as there is nowhere to send the client.
    pub fn redirect_response(&self, route: &str, args: Option<&Map<String, Value>>) -> Result<Response> {
        let mut response = Response::new();
        let routes = self.routes()?;
        match routes.find(route) {
            Some(route) => {
                let request = self.container.get::<Request>(REQUEST_SERVICE)?;
                response.set_redirect_to_route(&route, args, request.as_deref())?;
            }
            None => log::warn!("Cannot redirect to unknown route '{}'", route),
        }
        Ok(response)
    }
}
