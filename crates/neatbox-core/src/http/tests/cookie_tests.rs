use chrono::Utc;

use crate::http::cookie::Cookie;

#[test]
fn test_new_cookie_defaults() {
    let cookie = Cookie::new("sid", "abc");
    assert_eq!(cookie.to_header_value(), "sid=abc; path=/; HttpOnly");
}

#[test]
fn test_name_and_value_are_sanitised() {
    let cookie = Cookie::new("my cookie=", "a;b,c\r\nd");
    assert_eq!(cookie.name, "mycookie");
    assert_eq!(cookie.value, "abcd");
}

#[test]
fn test_all_attributes() {
    let cookie = Cookie::new("theme", "dark")
        .with_expire(1_320_926_750)
        .with_path("/app")
        .with_domain("example.com")
        .with_secure(true)
        .with_http_only(false);

    assert_eq!(
        cookie.to_header_value(),
        "theme=dark; expires=Thu, 10 Nov 2011 12:05:50 GMT; path=/app; domain=example.com; secure"
    );
}

#[test]
fn test_empty_path_falls_back_to_root() {
    assert_eq!(Cookie::new("a", "b").with_path("").path, "/");
}

#[test]
fn test_removal_cookie_expires_in_the_past() {
    let cookie = Cookie::removal("sid");
    assert_eq!(cookie.value, "");
    assert!(cookie.expire < Utc::now().timestamp());
    assert!(cookie.to_header_value().contains("expires="));
}
