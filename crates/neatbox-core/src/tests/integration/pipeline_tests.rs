#![cfg(test)]

use crate::http::Request;
use crate::kernel::error::Error;
use crate::tests::integration::common::{DemoApp, ROUTES, app_tree};

#[test]
fn test_hello_end_to_end() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/hello/Rik", "GET", &[])).expect("request should succeed");
    assert_eq!(response.status(), 200);
    assert!(response.content().contains("Rik"));
    assert!(response.to_http_string().starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_path_is_decoded_once() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/hello/Ada%20Lovelace", "GET", &[])).unwrap();
    assert_eq!(response.content(), "Hello Ada Lovelace");

    let response = kernel.handle(Request::create("/hello/100%2525", "GET", &[])).unwrap();
    assert_eq!(response.content(), "Hello 100%25");
}

#[test]
fn test_first_declared_route_wins() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/hello/World", "GET", &[])).unwrap();
    assert_eq!(response.content(), "Hello World", "hello is declared before hello_shadow");
}

#[test]
fn test_optional_tail_takes_default() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/blog/42/", "GET", &[])).unwrap();
    assert_eq!(response.content(), "page 42 section fish");

    let response = kernel.handle(Request::create("/blog/42/cars", "GET", &[])).unwrap();
    assert_eq!(response.content(), "page 42 section cars");
}

#[test]
fn test_method_gating() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/contact", "GET", &[])).unwrap();
    assert_eq!(response.status(), 404, "a GET falls through to the 404 route");

    let response = kernel.handle(Request::create("/contact", "POST", &[("name", "Ada")])).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.content(), "thanks Ada");
}

#[test]
fn test_protocol_gating() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("http://localhost/secure", "GET", &[])).unwrap();
    assert_eq!(response.status(), 404);

    let response = kernel.handle(Request::create("https://localhost/secure", "GET", &[])).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.content(), "Neatbox");
}

#[test]
fn test_not_found_route_fallback() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/definitely/not/here", "GET", &[])).unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.content(), "Page not found");
}

#[test]
fn test_page_not_found_without_fallback() {
    let routes: String = ROUTES.split("\"404\":").next().unwrap_or_default().to_string();
    let tree = app_tree(&routes);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let error = kernel.handle(Request::create("/definitely/not/here", "GET", &[])).unwrap_err();
    assert!(error.is_not_found());
    assert!(matches!(error, Error::PageNotFound { ref path } if path == "/definitely/not/here"));
}

#[test]
fn test_value_result_is_fatal_without_listener() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).kernel();

    match kernel.handle(Request::create("/data", "GET", &[])) {
        Err(Error::ControllerContract { controller, action }) => {
            assert_eq!(controller, "demo::controllers::Demo");
            assert_eq!(action, "dataAction");
        }
        other => panic!("Expected ControllerContract, got {:?}", other),
    }
}

#[test]
fn test_value_result_recovered_by_listener() {
    let tree = app_tree(ROUTES);
    let mut kernel = DemoApp::new(tree.path()).with_json_responses().kernel();

    let response = kernel.handle(Request::create("/data", "GET", &[])).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.content(), r#"{"items":[1,2,3]}"#);
    assert_eq!(response.header("Content-Type"), Some("application/json; charset=UTF-8"));
}

#[test]
fn test_short_form_route_table_dispatches() {
    let tree = app_tree(
        r#"
hello:
  url: /hello/{name}
  controller: demo:Demo:hello
  defaults: {name: World}
contact:
  url: /contact
  controller: demo:Demo:contact
  method: POST
"#,
    );
    let mut kernel = DemoApp::new(tree.path()).kernel();

    let response = kernel.handle(Request::create("/hello/Rik", "GET", &[])).expect("request should succeed");
    assert_eq!(response.status(), 200);
    assert_eq!(response.content(), "Hello Rik");

    let response = kernel.handle(Request::create("/contact", "POST", &[("name", "Ada")])).unwrap();
    assert_eq!(response.content(), "thanks Ada");
    let result = kernel.handle(Request::create("/contact", "GET", &[]));
    assert!(matches!(result, Err(Error::PageNotFound { .. })), "top-level method is honoured");
}
