//! The application's route table, registered as the `routes` service.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::container::{ContainerAware, ContainerHandle};
use crate::http::request::Request;
use crate::kernel::constants::{
    CACHE_SERVICE, CONFIG_SERVICE, DEFAULT_ROUTES_RESOURCE, REQUEST_SERVICE, RESOURCES_SERVICE, ROUTE_CACHE_TTL,
    ROUTES_CONFIG_KEY,
};
use crate::kernel::error::Result;
use crate::kernel::resource::ResourceLocator;
use crate::routing::route::Route;
use crate::storage::cache::Cache;
use crate::storage::config::{ConfigSettings, read_value};

/// Declarative form of a route, as read from the routes resource and as
/// stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

impl From<RouteSpec> for Route {
    fn from(spec: RouteSpec) -> Self {
        Route::from_parts(spec.name, spec.url, spec.options, spec.placeholders, spec.defaults)
    }
}

const ROUTE_OPTION_KEYS: [&str; 3] = ["controller", "method", "protocol"];

fn object_field(item: &Map<String, Value>, key: &str) -> Map<String, Value> {
    item.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
}

/// Ordered set of routes. The first route that matches wins.
#[derive(Default)]
pub struct RouteCollection {
    container: ContainerHandle,
    routes: RefCell<Vec<Rc<Route>>>,
    loaded: Cell<bool>,
}

impl fmt::Debug for RouteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCollection")
            .field("routes", &self.routes.borrow().iter().map(|r| r.name().to_string()).collect::<Vec<_>>())
            .field("loaded", &self.loaded.get())
            .finish()
    }
}

impl ContainerAware for RouteCollection {
    fn set_container(&mut self, container: ContainerHandle) {
        self.container = container;
    }
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. A route with the same name is replaced in place.
    pub fn add(&self, route: Route) {
        let route = Rc::new(route);
        let mut routes = self.routes.borrow_mut();
        match routes.iter_mut().find(|existing| existing.name() == route.name()) {
            Some(existing) => *existing = route,
            None => routes.push(route),
        }
    }

    /// The named route, if there is one.
    pub fn find(&self, name: &str) -> Option<Rc<Route>> {
        self.routes.borrow().iter().find(|route| route.name() == name).cloned()
    }

    /// All routes in match order.
    pub fn all(&self) -> Vec<Rc<Route>> {
        self.routes.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.borrow().is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    /// Load the route table once. Later calls are no-ops until [`reload`](Self::reload).
    pub fn load(&self) -> Result<()> {
        if self.loaded.get() {
            return Ok(());
        }
        self.reload()
    }

    /// Replace the route table with the routes resource named by
    /// `snb.routes` (default `::routes.yml`).
    ///
    /// The parsed table is cached under `RouteCollection::<resource>`; a
    /// cache hit skips reading the resource.
    pub fn reload(&self) -> Result<()> {
        let container = self.container.upgrade()?;
        let resource = container
            .get::<ConfigSettings>(CONFIG_SERVICE)?
            .and_then(|config| config.get_str(ROUTES_CONFIG_KEY).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ROUTES_RESOURCE.to_string());
        let cache_key = format!("RouteCollection::{}", resource);
        let cache = container.get::<Box<dyn Cache>>(CACHE_SERVICE)?;

        let cached = cache.as_ref().and_then(|cache| cache.get(&cache_key)).and_then(|value| {
            serde_json::from_value::<Vec<RouteSpec>>(value)
                .map_err(|e| log::warn!("Ignoring unreadable cached routes '{}': {}", cache_key, e))
                .ok()
        });

        let specs = match cached {
            Some(specs) => {
                log::debug!("Loaded {} routes from cache '{}'", specs.len(), cache_key);
                specs
            }
            None => {
                let specs = self.load_from_resource(&resource)?;
                if let Some(cache) = &cache {
                    match serde_json::to_value(&specs) {
                        Ok(value) => {
                            cache.set(&cache_key, value, ROUTE_CACHE_TTL);
                        }
                        Err(e) => log::warn!("Could not cache routes '{}': {}", cache_key, e),
                    }
                }
                specs
            }
        };

        let routes = specs.into_iter().map(|spec| Rc::new(Route::from(spec))).collect();
        *self.routes.borrow_mut() = routes;
        self.loaded.set(true);
        Ok(())
    }

    /// Read and parse a routes resource (a `config` type resource).
    pub fn load_from_resource(&self, resource: &str) -> Result<Vec<RouteSpec>> {
        let locator = self.container.require::<ResourceLocator>(RESOURCES_SERVICE)?;
        let path = locator.find_resource(resource, "config")?;
        log::debug!("Loading routes from '{}'", path.display());
        Ok(Self::parse_routes(read_value(&path)?))
    }

    /// Turn a routes document (a map of route name to definition) into
    /// route specs, in document order.
    ///
    /// `controller`, `method` and `protocol` may also sit next to the `url`
    /// instead of under `options`. Entries without a `url`, or without a
    /// `controller`, are skipped.
    pub fn parse_routes(document: Value) -> Vec<RouteSpec> {
        let Value::Object(entries) = document else {
            return Vec::new();
        };

        let mut specs = Vec::with_capacity(entries.len());
        for (name, item) in entries {
            let Some(item) = item.as_object() else {
                log::debug!("Skipping route '{}': not a map", name);
                continue;
            };
            let Some(url) = item.get("url").and_then(Value::as_str) else {
                log::debug!("Skipping route '{}': no url", name);
                continue;
            };
            let mut options = object_field(item, "options");
            if !options.contains_key("controller") {
                // Short form: options written next to the url
                for key in ROUTE_OPTION_KEYS {
                    if let Some(value) = item.get(key) {
                        options.entry(key.to_string()).or_insert_with(|| value.clone());
                    }
                }
            }
            if !options.contains_key("controller") {
                log::debug!("Skipping route '{}': no controller", name);
                continue;
            }

            let placeholders = object_field(item, "placeholders")
                .into_iter()
                .map(|(var, kind)| {
                    let kind = match kind {
                        Value::String(kind) => kind,
                        other => other.to_string(),
                    };
                    (var, kind)
                })
                .collect();

            specs.push(RouteSpec {
                url: url.to_string(),
                options,
                placeholders,
                defaults: object_field(item, "defaults"),
                name,
            });
        }
        specs
    }

    /// The first route matching the request, in declaration order.
    ///
    /// The request path is url-decoded once before matching.
    pub fn find_matching_route(&self, request: &Request) -> Option<Rc<Route>> {
        let raw = request.path().replace('+', " ");
        let path = percent_decode_str(&raw).decode_utf8_lossy();
        self.routes
            .borrow()
            .iter()
            .find(|route| route.is_match(&path, request))
            .cloned()
    }

    /// Build the url of the named route. Unknown routes give an empty string.
    ///
    /// A fully qualified url is prefixed with `scheme://host[:port]` of the
    /// current `request` service.
    pub fn generate(&self, name: &str, args: Option<&Map<String, Value>>, fully_qualified: bool) -> String {
        let mut url = match self.find(name) {
            Some(route) => route.generate(args).unwrap_or_else(|e| {
                log::warn!("{}", e);
                String::new()
            }),
            None => {
                log::debug!("Cannot generate url for unknown route '{}'", name);
                String::new()
            }
        };

        if fully_qualified {
            if let Ok(Some(request)) = self.container.get::<Request>(REQUEST_SERVICE) {
                url = format!("{}{}", request.http_host(), url);
            }
        }
        url
    }
}
