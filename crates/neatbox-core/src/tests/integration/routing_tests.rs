#![cfg(test)]

use std::fs;

use serde_json::{Map, Value, json};

use crate::container::ServiceDefinition;
use crate::http::Request;
use crate::kernel::constants::{CACHE_SERVICE, ROUTES_SERVICE};
use crate::routing::RouteCollection;
use crate::storage::cache::{Cache, MemoryCache};
use crate::tests::integration::common::{DemoApp, ROUTES, app_tree};

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_routes_resource_named_by_config() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();
    kernel.boot().unwrap();

    let routes = kernel.container().require::<RouteCollection>(ROUTES_SERVICE).unwrap();
    routes.load().unwrap();
    assert_eq!(routes.len(), 8);
    let names: Vec<String> = routes.all().iter().map(|route| route.name().to_string()).collect();
    assert_eq!(names.first().map(String::as_str), Some("home"));
    assert_eq!(names.last().map(String::as_str), Some("404"));
}

#[test]
fn test_generate_relative_and_fully_qualified() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();
    kernel.handle(Request::create("https://shop.example.com:8443/", "GET", &[])).unwrap();

    let routes = kernel.container().require::<RouteCollection>(ROUTES_SERVICE).unwrap();
    assert_eq!(routes.generate("blog", Some(&args(json!({"page": 7}))), false), "/blog/7/fish");
    assert_eq!(
        routes.generate("blog", Some(&args(json!({"page": 7, "section": "cars"}))), true),
        "https://shop.example.com:8443/blog/7/cars"
    );
    assert_eq!(routes.generate("hello", Some(&args(json!({"name": "Rik", "lang": "nl"}))), false), "/hello/Rik?lang=nl");
    assert_eq!(routes.generate("nope", None, true), "");
}

#[test]
fn test_generated_url_routes_back() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();
    kernel.boot().unwrap();

    let routes = kernel.container().require::<RouteCollection>(ROUTES_SERVICE).unwrap();
    routes.load().unwrap();
    let url = routes.generate("blog", Some(&args(json!({"page": 12, "section": "boats"}))), false);

    let response = kernel.handle(Request::create(&url, "GET", &[])).unwrap();
    assert_eq!(response.content(), "page 12 section boats");
}

#[test]
fn test_route_table_survives_in_app_cache() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path())
        .with_services(|container| {
            container.register(ServiceDefinition::new(CACHE_SERVICE, |_args| {
                Ok(Box::new(MemoryCache::new()) as Box<dyn Cache>)
            }));
            Ok(())
        })
        .kernel();

    kernel.handle(Request::create("/hello/cache", "GET", &[])).unwrap();
    fs::remove_file(tree.path().join("resources/config/routing.yml")).unwrap();

    let routes = kernel.container().require::<RouteCollection>(ROUTES_SERVICE).unwrap();
    routes.reload().expect("reload should be served from the cache");
    assert_eq!(routes.len(), 8);

    let response = kernel.handle(Request::create("/hello/again", "GET", &[])).unwrap();
    assert_eq!(response.content(), "Hello again");
}
