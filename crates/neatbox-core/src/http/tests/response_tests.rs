use chrono::{TimeZone, Utc};
use serde_json::{Map, json};

use crate::http::cookie::Cookie;
use crate::http::request::Request;
use crate::http::response::{CachePolicy, MAX_AGE_LIMIT, Response, http_date, status_text};
use crate::routing::Route;

#[test]
fn test_new_response_is_html_200() {
    let response = Response::new();
    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert_eq!(response.header("content-type"), Some("text/html; charset=UTF-8"));
    assert_eq!(response.content(), "");
}

#[test]
fn test_invalid_status_is_ignored() {
    let mut response = Response::with_content("gone", 410);
    assert_eq!(response.status(), 410);

    assert!(!response.set_status(299));
    assert_eq!(response.status(), 410);

    assert_eq!(Response::with_content("x", 999).status(), 200);
    assert_eq!(status_text(418), Some("I'm a teapot"));
    assert_eq!(status_text(306), None);
}

#[test]
fn test_header_names_are_normalised() {
    let mut response = Response::new();
    response.set_header("x_powered_by", "neatbox");
    response.set_header("X-POWERED-BY", "neatbox 2");

    assert_eq!(response.header("X-Powered-By"), Some("neatbox 2"));
    assert_eq!(response.headers().count(), 2);

    response.remove_header("x-powered-by");
    assert!(!response.has_header("X-Powered-By"));
}

#[test]
fn test_content_types() {
    let mut response = Response::new();
    assert!(response.set_content_type("json", "UTF-8"));
    assert_eq!(response.header("Content-Type"), Some("application/json; charset=UTF-8"));
    assert!(response.set_content_type("png", "UTF-8"));
    assert_eq!(response.header("Content-Type"), Some("image/png"));
    assert!(!response.set_content_type("exe", "UTF-8"));
    assert_eq!(response.header("Content-Type"), Some("image/png"));
}

#[test]
fn test_json_content() {
    let mut response = Response::new();
    response.set_content_json(&json!({"id": 7, "tags": ["a"]})).unwrap();

    assert_eq!(response.content(), r#"{"id":7,"tags":["a"]}"#);
    assert_eq!(response.header("Content-Type"), Some("application/json; charset=UTF-8"));
}

#[test]
fn test_max_age_is_clamped() {
    let mut response = Response::new();
    response.set_max_age(-5);
    assert_eq!(response.max_age(), 0);
    response.set_max_age(i64::MAX);
    assert_eq!(response.max_age(), MAX_AGE_LIMIT);
    response.set_max_age(600);
    assert_eq!(response.max_age(), 600);
}

#[test]
fn test_cache_policies() {
    let mut response = Response::new();
    response.set_etag("v1");
    response.set_cache_policy(CachePolicy::Never);
    assert_eq!(
        response.header("Cache-Control"),
        Some("no-cache, no-store, private, must-revalidate")
    );
    assert_eq!(response.header("Expires"), Some("Thu, 11 Feb 2010 12:42:42 GMT"));
    assert!(!response.has_header("ETag"));

    let mut response = Response::new();
    response.set_max_age(600);
    response.set_cache_policy(CachePolicy::Public);
    assert_eq!(response.header("Cache-Control"), Some("public, max-age=600, s-maxage=600"));
    assert_eq!(response.header("Vary"), Some("Accept-Encoding"));
    assert!(response.has_header("Expires"));

    let mut response = Response::new();
    response.set_cache_policy(CachePolicy::Private);
    assert_eq!(response.header("Cache-Control"), Some("private, must-revalidate"));
    assert!(!response.has_header("Expires"));

    let mut response = Response::new();
    response.set_cache_policy(CachePolicy::Static);
    assert_eq!(
        response.header("Cache-Control"),
        Some("public, max-age=31536000, s-maxage=31536000")
    );
}

#[test]
fn test_etag_is_deterministic() {
    let mut first = Response::new();
    let mut second = Response::new();
    first.set_etag("article-42-v3");
    second.set_etag("article-42-v3");

    let tag = first.header("ETag").unwrap();
    assert_eq!(Some(tag), second.header("ETag"));
    assert_eq!(tag.len(), 66);
    assert!(tag.starts_with('"') && tag.ends_with('"'));
}

#[test]
fn test_conditional_get_with_etag() {
    let mut response = Response::with_content("article", 200);
    response.set_etag("v1");
    let etag = response.header("ETag").unwrap().to_string();

    let request = Request::from_cgi_parts([("HTTP_IF_NONE_MATCH", etag.as_str())], "");
    assert!(response.is_not_modified(&request));
    assert_eq!(response.status(), 304);
    assert_eq!(response.content(), "");
    assert!(!response.has_header("Content-Type"));
    assert!(response.has_header("ETag"));
}

#[test]
fn test_conditional_get_needs_all_validators() {
    let modified = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let mut response = Response::with_content("article", 200);
    response.set_etag("v1");
    response.set_last_modified(&modified);
    let etag = response.header("ETag").unwrap().to_string();

    let stale = Request::from_cgi_parts(
        [
            ("HTTP_IF_NONE_MATCH", etag.as_str()),
            ("HTTP_IF_MODIFIED_SINCE", "Tue, 30 Apr 2024 08:00:00 GMT"),
        ],
        "",
    );
    assert!(!response.is_not_modified(&stale));
    assert_eq!(response.status(), 200);

    let fresh = Request::from_cgi_parts([("HTTP_IF_MODIFIED_SINCE", http_date(&modified).as_str())], "");
    assert!(response.is_not_modified(&fresh));
    assert_eq!(response.status(), 304);
}

#[test]
fn test_no_validators_is_modified() {
    let mut response = Response::with_content("article", 200);
    response.set_etag("v1");
    assert!(!response.is_not_modified(&Request::create("/", "GET", &[])));
    assert_eq!(response.content(), "article");
}

#[test]
fn test_redirects() {
    let mut response = Response::new();
    response.set_redirect_to_url("/login");
    assert_eq!(response.status(), 302);
    assert_eq!(response.header("Location"), Some("/login"));

    let route = Route::new("blog", "/blog/{page}").with_placeholder("page", "int");
    let mut args = Map::new();
    args.insert("page".to_string(), json!(3));

    let mut response = Response::new();
    response.set_redirect_to_route(&route, Some(&args), None).unwrap();
    assert_eq!(response.header("Location"), Some("/blog/3"));

    let request = Request::create("http://example.com:8080/", "GET", &[]);
    response.set_redirect_to_route(&route, Some(&args), Some(&request)).unwrap();
    assert_eq!(response.header("Location"), Some("http://example.com:8080/blog/3"));
}

#[test]
fn test_cookies_replace_by_name() {
    let mut response = Response::new();
    response.add_cookie(Cookie::new("sid", "one"));
    response.add_cookie(Cookie::new("theme", "dark"));
    response.add_cookie(Cookie::new("sid", "two"));

    let values: Vec<&str> = response.cookies().iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["dark", "two"]);

    response.remove_cookie("theme");
    assert_eq!(response.cookies().len(), 1);
}

#[test]
fn test_http_rendering() {
    let mut response = Response::with_content("missing", 404);
    response.add_cookie(Cookie::new("sid", "abc"));

    assert_eq!(
        response.to_http_string(),
        "HTTP/1.1 404 Not Found\r\n\
         Content-Type: text/html; charset=UTF-8\r\n\
         Set-Cookie: sid=abc; path=/; HttpOnly\r\n\
         \r\n\
         missing"
    );
    assert!(response.to_cgi_string().starts_with("Status: 404 Not Found\r\nContent-Type: "));
}
