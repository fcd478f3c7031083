/// Framework name
pub const FRAMEWORK_NAME: &str = "neatbox";

/// Framework version
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package that owns resources addressed without a package name (`::config.yml`)
pub const APP_PACKAGE: &str = "app";

/// Service names registered by the kernel
pub const CONFIG_SERVICE: &str = "config";
pub const CONTAINER_SERVICE: &str = "container";
pub const RESOURCES_SERVICE: &str = "resources";
pub const EVENT_DISPATCHER_SERVICE: &str = "event-dispatcher";
pub const LOGGER_SERVICE: &str = "logger";
pub const CACHE_SERVICE: &str = "cache";
pub const SESSION_SERVICE: &str = "session";
pub const ROUTES_SERVICE: &str = "routes";
pub const REQUEST_SERVICE: &str = "request";

/// Config resource loaded when the application does not name one
pub const DEFAULT_CONFIG_RESOURCE: &str = "::config.yml";

/// Config key naming the routes resource
pub const ROUTES_CONFIG_KEY: &str = "snb.routes";

/// Routes resource used when `snb.routes` is not set
pub const DEFAULT_ROUTES_RESOURCE: &str = "::routes.yml";

/// Seconds a parsed route table stays in the cache
pub const ROUTE_CACHE_TTL: u64 = 3600;

/// Route used when nothing else matches
pub const NOT_FOUND_ROUTE: &str = "404";

/// Handle to the booted kernel, registered as `kernel`
pub const KERNEL_SERVICE: &str = "kernel";
