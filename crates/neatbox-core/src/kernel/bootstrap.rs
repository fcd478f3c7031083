use std::path::PathBuf;
use std::rc::Rc;

use crate::container::{ServiceContainer, ServiceDefinition};
use crate::event::{EventDispatcher, ExceptionEvent, NoResponseEvent, RequestEvent, ResponseEvent, RouteEvent};
use crate::http::session::{NullSession, SessionStorage};
use crate::http::{Request, Response};
use crate::kernel::component::{AppKernel, KernelHandle, Package};
use crate::kernel::constants::{
    CACHE_SERVICE, CONFIG_SERVICE, CONTAINER_SERVICE, EVENT_DISPATCHER_SERVICE, FRAMEWORK_NAME, FRAMEWORK_VERSION,
    KERNEL_SERVICE, LOGGER_SERVICE, NOT_FOUND_ROUTE, REQUEST_SERVICE, RESOURCES_SERVICE, ROUTES_SERVICE,
    SESSION_SERVICE,
};
use crate::kernel::controller::{ActionOutput, ControllerRegistry};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::resource::ResourceLocator;
use crate::logger::Logger;
use crate::routing::{Route, RouteCollection};
use crate::storage::cache::{Cache, NullCache};
use crate::storage::config::ConfigSettings;

/// The front controller: boots an application into a fresh service
/// container and turns one request into one response.
pub struct Kernel {
    app: Box<dyn AppKernel>,
    environment: String,
    container: Rc<ServiceContainer>,
    locator: Rc<ResourceLocator>,
    logger: Rc<Logger>,
    controllers: ControllerRegistry,
    packages: Vec<Box<dyn Package>>,
    booted: bool,
}

impl Kernel {
    /// Create a kernel for `app` running in `environment` (`dev`, `prod`, `test`...).
    pub fn new(app: impl AppKernel + 'static, environment: &str) -> Self {
        let logger = Rc::new(Logger::new());
        logger.log_time("Creating kernel");
        Kernel {
            app: Box::new(app),
            environment: environment.to_string(),
            container: ServiceContainer::new(),
            locator: Rc::new(ResourceLocator::new()),
            logger,
            controllers: ControllerRegistry::new(),
            packages: Vec::new(),
            booted: false,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn container(&self) -> &Rc<ServiceContainer> {
        &self.container
    }

    pub fn logger(&self) -> &Rc<Logger> {
        &self.logger
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// Names of the booted packages, in boot order.
    pub fn packages(&self) -> Vec<&str> {
        self.packages.iter().map(|package| package.name()).collect()
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// What packages and events see of this kernel.
    pub fn kernel_handle(&self) -> KernelHandle {
        KernelHandle {
            environment: self.environment.clone(),
            container: self.container.handle(),
            locator: Rc::clone(&self.locator),
        }
    }

    pub fn find_resource(&self, name: &str, kind: &str) -> Result<PathBuf> {
        self.locator.find_resource(name, kind)
    }

    pub fn find_path(&self, name: &str) -> Result<PathBuf> {
        self.locator.find_path(name)
    }

    /// Register packages and services, then boot every bootable package.
    /// Does nothing once the kernel has booted.
    pub fn boot(&mut self) -> Result<()> {
        if self.booted {
            return Ok(());
        }
        log::info!("Booting {} v{} ({})", FRAMEWORK_NAME, FRAMEWORK_VERSION, self.environment);

        self.locator = Rc::new(ResourceLocator::with_packages(self.app.register_packages()));
        self.register_core_services()?;
        self.app.register_services(&self.container)?;

        let kernel = self.kernel_handle();
        for mut package in self.app.bootable() {
            if let Some(aware) = package.container_aware() {
                aware.set_container(self.container.handle());
            }
            package.register_controllers(&mut self.controllers);

            log::debug!("Booting package '{}'", package.name());
            if let Err(e) = package.boot(&kernel) {
                let message = format!("package '{}' failed to boot", package.name());
                return Err(Error::lifecycle(KernelLifecyclePhase::Boot, message, Some(e)));
            }
            self.packages.push(package);
        }

        self.booted = true;
        self.logger.log_time("Kernel booted");
        Ok(())
    }

    fn register_core_services(&self) -> Result<()> {
        let config = ConfigSettings::load(&self.locator, &self.app.config_name(&self.environment))?;
        self.container.set(CONFIG_SERVICE, Rc::new(config));
        // A handle rather than the container itself, which would keep itself alive
        self.container.set(CONTAINER_SERVICE, Rc::new(self.container.handle()));
        self.container.set(KERNEL_SERVICE, Rc::new(self.kernel_handle()));
        self.container.set(RESOURCES_SERVICE, Rc::clone(&self.locator));
        self.container.set(LOGGER_SERVICE, Rc::clone(&self.logger));

        self.container
            .register(ServiceDefinition::new(EVENT_DISPATCHER_SERVICE, |_args| Ok(EventDispatcher::new())));
        self.container.register(ServiceDefinition::new(CACHE_SERVICE, |_args| {
            Ok(Box::new(NullCache) as Box<dyn Cache>)
        }));
        self.container.register(
            ServiceDefinition::new(SESSION_SERVICE, |_args| {
                Ok(Box::new(NullSession::new()) as Box<dyn SessionStorage>)
            })
            .add_call::<Box<dyn SessionStorage>, _>("start", Vec::new(), |session, _args| {
                session.start();
                Ok(())
            }),
        );
        self.container
            .register(ServiceDefinition::container_aware(ROUTES_SERVICE, |_args| Ok(RouteCollection::new())));
        Ok(())
    }

    /// Boot if needed and handle one request.
    ///
    /// Errors raised while handling are offered to `kernel.exception`
    /// listeners; when none of them produces a response the original error
    /// is returned.
    pub fn handle(&mut self, request: Request) -> Result<Response> {
        self.boot()?;

        let request = Rc::new(request);
        match self.dispatch(&request) {
            Ok(response) => Ok(response),
            Err(error) => self.handle_error(request, error),
        }
    }

    fn dispatcher(&self) -> Result<Option<Rc<EventDispatcher>>> {
        self.container.get::<EventDispatcher>(EVENT_DISPATCHER_SERVICE)
    }

    fn dispatch(&self, request: &Rc<Request>) -> Result<Response> {
        if let Some(session) = self.container.get::<Box<dyn SessionStorage>>(SESSION_SERVICE)? {
            request.set_session(session);
        }
        self.container.set(REQUEST_SERVICE, Rc::clone(request));
        let dispatcher = self.dispatcher()?;

        // Firewall
        if let Some(dispatcher) = &dispatcher {
            let mut event = RequestEvent::new(self.kernel_handle(), Rc::clone(request));
            dispatcher.dispatch(&mut event)?;
            if let Some(response) = event.take_response() {
                log::debug!("'{}' answered by a kernel.request listener", request.path());
                return self.post_process(request, response, Some(&**dispatcher));
            }
        }

        let routes = self.container.require::<RouteCollection>(ROUTES_SERVICE)?;
        routes.load()?;
        let route = routes
            .find_matching_route(request)
            .or_else(|| routes.find(NOT_FOUND_ROUTE))
            .ok_or_else(|| Error::PageNotFound { path: request.path() })?;

        let route = match &dispatcher {
            Some(dispatcher) => {
                let mut event = RouteEvent::new(Rc::clone(request), route, Rc::clone(&routes));
                dispatcher.dispatch(&mut event)?;
                event.into_route()
            }
            None => route,
        };
        log::debug!("Dispatching '{}' to route '{}'", request.path(), route.name());

        let response = match self.run_controller(&route)? {
            ActionOutput::Response(response) => response,
            original => {
                let mut event = NoResponseEvent::new(Rc::clone(request), original, self.kernel_handle(), Rc::clone(&route));
                if let Some(dispatcher) = &dispatcher {
                    dispatcher.dispatch(&mut event)?;
                }
                event.take_response().ok_or_else(|| Error::ControllerContract {
                    controller: route.controller().unwrap_or_default().to_string(),
                    action: route.action().unwrap_or_default().to_string(),
                })?
            }
        };

        self.post_process(request, response, dispatcher.as_deref())
    }

    fn run_controller(&self, route: &Route) -> Result<ActionOutput> {
        let controller_id = route.controller()?;
        let action = route.action()?;

        let mut controller = self.controllers.create(controller_id).ok_or_else(|| Error::ControllerNotFound {
            controller: controller_id.to_string(),
        })?;
        if let Some(aware) = controller.container_aware() {
            aware.set_container(self.container.handle());
        }

        if !controller.init() {
            log::debug!("Controller '{}' declined to run '{}'", controller_id, action);
            return Ok(ActionOutput::none());
        }
        if !controller.has_action(action) {
            log::warn!("Controller '{}' has no action '{}'", controller_id, action);
            return Ok(ActionOutput::none());
        }

        self.logger.log_time(format!("Calling {}::{}", controller_id, action));
        controller.call_action(action, &route.argument_values())
    }

    fn post_process(
        &self,
        request: &Rc<Request>,
        response: Response,
        dispatcher: Option<&EventDispatcher>,
    ) -> Result<Response> {
        let Some(dispatcher) = dispatcher else {
            return Ok(response);
        };
        let mut event = ResponseEvent::new(Rc::clone(request), response);
        dispatcher.dispatch(&mut event)?;
        Ok(event.into_response())
    }

    fn handle_error(&self, request: Rc<Request>, error: Error) -> Result<Response> {
        log::error!("Error while handling '{}': {}", request.path(), error);

        let dispatcher = match self.dispatcher() {
            Ok(Some(dispatcher)) => dispatcher,
            Ok(None) => return Err(error),
            Err(secondary) => {
                log::error!("Event dispatcher unavailable while handling an error: {}", secondary);
                return Err(error);
            }
        };

        let mut event = ExceptionEvent::new(Rc::clone(&request), self.kernel_handle(), error);
        if let Err(secondary) = dispatcher.dispatch(&mut event) {
            log::error!("kernel.exception listener failed: {}", secondary);
            return Err(event.into_error());
        }

        let Some(response) = event.take_response() else {
            return Err(event.into_error());
        };
        match self.post_process(&request, response, Some(&*dispatcher)) {
            Ok(response) => Ok(response),
            Err(secondary) => {
                log::error!("kernel.response listener failed for an error response: {}", secondary);
                Err(event.into_error())
            }
        }
    }
}
