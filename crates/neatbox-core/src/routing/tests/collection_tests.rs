use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde_json::{Map, json};
use tempfile::tempdir;

use crate::container::{ServiceContainer, ServiceDefinition};
use crate::http::Request;
use crate::kernel::constants::{CACHE_SERVICE, CONFIG_SERVICE, REQUEST_SERVICE, RESOURCES_SERVICE, ROUTES_SERVICE};
use crate::kernel::error::Error;
use crate::kernel::resource::ResourceLocator;
use crate::routing::{Route, RouteCollection};
use crate::storage::cache::{Cache, MemoryCache, NullCache};
use crate::storage::config::ConfigSettings;

const ROUTES: &str = r#"
home:
  url: /
  options:
    controller: "example:DemoController:index"
hello:
  url: /hello/{name}
  options:
    controller: "example:DemoController:hello"
  placeholders:
    name: text
  defaults:
    name: World
greeting:
  url: /hello/{name}
  options:
    controller: "example:DemoController:greet"
nourl:
  options:
    controller: "example:DemoController:index"
nocontroller:
  url: /nowhere
"#;

fn write_routes(root: &Path, file: &str, contents: &str) {
    let dir = root.join("resources").join("config");
    fs::create_dir_all(&dir).expect("Failed to create config directory");
    fs::write(dir.join(file), contents).expect("Failed to write routes file");
}

// Container with the services the route collection depends on
fn setup(root: &Path, config: ConfigSettings, cache: Box<dyn Cache>) -> (Rc<ServiceContainer>, Rc<RouteCollection>) {
    let container = ServiceContainer::new();
    container.set(RESOURCES_SERVICE, Rc::new(ResourceLocator::with_packages([("app", root)])));
    container.set(CONFIG_SERVICE, Rc::new(config));
    container.set(CACHE_SERVICE, Rc::new(cache));
    container.register(ServiceDefinition::container_aware(ROUTES_SERVICE, |_args| Ok(RouteCollection::new())));

    let routes = container
        .require::<RouteCollection>(ROUTES_SERVICE)
        .expect("routes service should build");
    (container, routes)
}

fn names(routes: &RouteCollection) -> Vec<String> {
    routes.all().iter().map(|route| route.name().to_string()).collect()
}

#[test]
fn test_parse_routes_skips_incomplete_entries() {
    let document = serde_yaml::from_str::<serde_json::Value>(ROUTES).unwrap();
    let specs = RouteCollection::parse_routes(document);

    let names: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
    assert_eq!(names, vec!["home", "hello", "greeting"]);
    assert_eq!(specs[1].placeholders.get("name").map(String::as_str), Some("text"));
    assert_eq!(specs[1].defaults.get("name"), Some(&json!("World")));
}

#[test]
fn test_parse_routes_accepts_short_form_options() {
    let document = serde_yaml::from_str::<serde_json::Value>(
        "hello:\n  url: /hello/{name}\n  controller: pkg:Demo:hello\n  defaults: {name: World}\n\
         login:\n  url: /login\n  controller: pkg:Demo:login\n  method: POST\n  protocol: https\n\
         nested:\n  url: /nested\n  controller: pkg:Demo:ignored\n  options:\n    controller: pkg:Demo:nested\n",
    )
    .unwrap();
    let specs = RouteCollection::parse_routes(document);

    assert_eq!(specs.len(), 3);
    assert_eq!(specs[0].options.get("controller"), Some(&json!("pkg:Demo:hello")));
    assert_eq!(specs[0].defaults.get("name"), Some(&json!("World")));
    assert_eq!(specs[1].options.get("method"), Some(&json!("POST")));
    assert_eq!(specs[1].options.get("protocol"), Some(&json!("https")));
    assert_eq!(specs[2].options.get("controller"), Some(&json!("pkg:Demo:nested")), "options win");

    let route = Route::from(specs[0].clone());
    assert_eq!(route.controller().unwrap(), "pkg::controllers::Demo");
}

#[test]
fn test_parse_routes_of_empty_document() {
    assert!(RouteCollection::parse_routes(serde_json::Value::Null).is_empty());
    assert!(RouteCollection::parse_routes(json!(["not", "a", "map"])).is_empty());
}

#[test]
fn test_load_from_default_resource() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "routes.yml", ROUTES);
    let (_container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(NullCache));

    assert!(!routes.is_loaded());
    routes.load().expect("routes should load");

    assert!(routes.is_loaded());
    assert_eq!(routes.len(), 3);
    assert_eq!(names(&routes), vec!["home", "hello", "greeting"]);
    assert_eq!(routes.find("hello").unwrap().url(), "/hello/{name}");
    assert!(routes.find("nourl").is_none());
}

#[test]
fn test_routes_resource_from_config() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "custom.yml", "only:\n  url: /only\n  options:\n    controller: 'a:B:c'\n");
    let mut config = ConfigSettings::new();
    config.set("snb.routes", "::custom.yml");
    let (_container, routes) = setup(dir.path(), config, Box::new(NullCache));

    routes.load().unwrap();
    assert_eq!(names(&routes), vec!["only"]);
}

#[test]
fn test_missing_routes_resource() {
    let dir = tempdir().unwrap();
    let (_container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(NullCache));

    assert!(matches!(routes.load(), Err(Error::ResourceNotFound { .. })));
    assert!(!routes.is_loaded());
}

#[test]
fn test_first_match_wins() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "routes.yml", ROUTES);
    let (_container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(NullCache));
    routes.load().unwrap();

    let request = Request::create("/hello/Rik", "GET", &[]);
    let matched = routes.find_matching_route(&request).expect("a route should match");
    assert_eq!(matched.name(), "hello");
    assert_eq!(matched.arguments().get("name"), Some(&json!("Rik")));

    assert!(routes.find_matching_route(&Request::create("/nowhere", "GET", &[])).is_none());
}

#[test]
fn test_path_is_decoded_once() {
    let routes = RouteCollection::new();
    routes.add(Route::new("hello", "/hello/{name}").with_option("controller", "a:B:c"));

    let request = Request::create("/hello/Rik%20van+Dam%2525", "GET", &[]);
    let matched = routes.find_matching_route(&request).unwrap();
    assert_eq!(matched.arguments().get("name"), Some(&json!("Rik van Dam%25")));
}

#[test]
fn test_add_replaces_by_name() {
    let routes = RouteCollection::new();
    routes.add(Route::new("a", "/a"));
    routes.add(Route::new("b", "/b"));
    routes.add(Route::new("a", "/a2"));

    assert_eq!(names(&routes), vec!["a", "b"]);
    assert_eq!(routes.find("a").unwrap().url(), "/a2");
}

#[test]
fn test_load_reads_source_once() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "routes.yml", ROUTES);
    let (_container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(NullCache));
    routes.load().unwrap();

    write_routes(dir.path(), "routes.yml", "new:\n  url: /new\n  options:\n    controller: 'a:B:c'\n");
    routes.load().unwrap();
    assert_eq!(routes.len(), 3);

    routes.reload().unwrap();
    assert_eq!(names(&routes), vec!["new"]);
}

#[test]
fn test_parsed_routes_are_cached() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "routes.yml", ROUTES);
    let (container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(MemoryCache::new()));
    routes.load().unwrap();

    let cache = container.require::<Box<dyn Cache>>(CACHE_SERVICE).unwrap();
    let cached = cache.get("RouteCollection::::routes.yml").expect("routes should be cached");
    assert_eq!(cached.as_array().map(Vec::len), Some(3));

    // A cache hit does not touch the resource
    fs::remove_file(dir.path().join("resources/config/routes.yml")).unwrap();
    routes.reload().unwrap();
    assert_eq!(names(&routes), vec!["home", "hello", "greeting"]);
}

#[test]
fn test_generate() {
    let dir = tempdir().unwrap();
    write_routes(dir.path(), "routes.yml", ROUTES);
    let (container, routes) = setup(dir.path(), ConfigSettings::new(), Box::new(NullCache));
    routes.load().unwrap();

    let mut args = Map::new();
    args.insert("name".to_string(), json!("Rik"));
    assert_eq!(routes.generate("hello", Some(&args), false), "/hello/Rik");
    assert_eq!(routes.generate("hello", Some(&Map::new()), false), "/hello/World");
    assert_eq!(routes.generate("missing", None, false), "");

    // No request service yet
    assert_eq!(routes.generate("home", None, true), "/");

    container.set(REQUEST_SERVICE, Rc::new(Request::create("https://example.com/", "GET", &[])));
    assert_eq!(routes.generate("hello", Some(&args), true), "https://example.com/hello/Rik");
}
