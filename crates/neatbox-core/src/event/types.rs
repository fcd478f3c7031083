//! Kernel lifecycle events.
use std::any::Any;
use std::rc::Rc;

use crate::event::Event;
use crate::http::{Request, Response};
use crate::kernel::component::KernelHandle;
use crate::kernel::controller::ActionOutput;
use crate::kernel::error::Error;
use crate::routing::{Route, RouteCollection};

/// Fired before routing. A listener may answer the request directly (firewall).
pub const KERNEL_REQUEST: &str = "kernel.request";
/// Fired after a route matched. A listener may replace the route.
pub const KERNEL_ROUTE: &str = "kernel.route";
/// Fired when an action returned something other than a response.
pub const KERNEL_NO_RESPONSE: &str = "kernel.no_response";
/// Fired with the final response. Listeners may modify it.
pub const KERNEL_RESPONSE: &str = "kernel.response";
/// Fired when handling failed. A listener may turn the error into a response.
pub const KERNEL_EXCEPTION: &str = "kernel.exception";

macro_rules! impl_event {
    ($type:ty, $name:expr) => {
        impl_event!($type, $name, |_event| false);
    };
    ($type:ty, $name:expr, |$event:ident| $has_result:expr) => {
        impl Event for $type {
            fn name(&self) -> &'static str {
                $name
            }

            fn has_result(&self) -> bool {
                let $event = self;
                $has_result
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

/// `kernel.request`
#[derive(Debug)]
pub struct RequestEvent {
    pub kernel: KernelHandle,
    pub request: Rc<Request>,
    response: Option<Response>,
}

impl RequestEvent {
    pub fn new(kernel: KernelHandle, request: Rc<Request>) -> Self {
        Self { kernel, request, response: None }
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl_event!(RequestEvent, KERNEL_REQUEST, |event| event.response.is_some());

/// `kernel.route`
#[derive(Debug)]
pub struct RouteEvent {
    pub request: Rc<Request>,
    pub route: Rc<Route>,
    pub routes: Rc<RouteCollection>,
    replacement: Option<Rc<Route>>,
}

impl RouteEvent {
    pub fn new(request: Rc<Request>, route: Rc<Route>, routes: Rc<RouteCollection>) -> Self {
        Self { request, route, routes, replacement: None }
    }

    /// Replace the matched route. The first listener to do so wins.
    pub fn set_route(&mut self, route: Rc<Route>) {
        self.replacement = Some(route);
    }

    pub fn replacement(&self) -> Option<&Rc<Route>> {
        self.replacement.as_ref()
    }

    /// The route to dispatch: the replacement if one was set, else the matched route.
    pub fn into_route(self) -> Rc<Route> {
        self.replacement.unwrap_or(self.route)
    }
}

impl_event!(RouteEvent, KERNEL_ROUTE, |event| event.replacement.is_some());

/// `kernel.no_response`
#[derive(Debug)]
pub struct NoResponseEvent {
    pub request: Rc<Request>,
    /// What the action actually returned.
    pub original: ActionOutput,
    pub kernel: KernelHandle,
    pub route: Rc<Route>,
    response: Option<Response>,
}

impl NoResponseEvent {
    pub fn new(request: Rc<Request>, original: ActionOutput, kernel: KernelHandle, route: Rc<Route>) -> Self {
        Self { request, original, kernel, route, response: None }
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl_event!(NoResponseEvent, KERNEL_NO_RESPONSE, |event| event.response.is_some());

/// `kernel.response`
#[derive(Debug)]
pub struct ResponseEvent {
    pub request: Rc<Request>,
    pub response: Response,
}

impl ResponseEvent {
    pub fn new(request: Rc<Request>, response: Response) -> Self {
        Self { request, response }
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

impl_event!(ResponseEvent, KERNEL_RESPONSE);

/// `kernel.exception`
#[derive(Debug)]
pub struct ExceptionEvent {
    pub request: Rc<Request>,
    pub kernel: KernelHandle,
    pub error: Error,
    response: Option<Response>,
}

impl ExceptionEvent {
    pub fn new(request: Rc<Request>, kernel: KernelHandle, error: Error) -> Self {
        Self { request, kernel, error, response: None }
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Give the original error back.
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl_event!(ExceptionEvent, KERNEL_EXCEPTION, |event| event.response.is_some());
