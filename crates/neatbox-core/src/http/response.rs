use std::fmt::Write as _;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::http::cookie::Cookie;
use crate::http::error::HttpError;
use crate::http::params::clean_header_name;
use crate::http::request::Request;
use crate::routing::Route;
use crate::routing::error::RoutingError;

/// One year, the longest max-age HTTP/1.1 allows.
pub const MAX_AGE_LIMIT: u32 = 60 * 60 * 24 * 365;

/// Canned caching behaviours for [`Response::set_cache_policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// No caching anywhere
    Never,
    /// Browser cache only, revalidated
    Private,
    /// Shared caches allowed
    Public,
    /// Cache for a year
    Static,
}

/// Reason phrase for a supported status code.
pub fn status_text(code: u16) -> Option<&'static str> {
    Some(match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    })
}

/// `Thu, 10 Nov 2011 12:05:50 GMT`
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// An HTTP response under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
    content: String,
    max_age: u32,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200 OK` HTML response.
    pub fn new() -> Self {
        let mut response = Self {
            status: 200,
            headers: Vec::new(),
            cookies: Vec::new(),
            content: String::new(),
            max_age: 0,
        };
        response.set_content_type("html", "UTF-8");
        response
    }

    /// HTML response with the given body. An unsupported status keeps `200`.
    pub fn with_content(content: impl Into<String>, status: u16) -> Self {
        let mut response = Self::new();
        response.set_content(content);
        response.set_status(status);
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the status code. Codes without a known reason phrase are ignored
    /// and the previous code is kept; returns whether the code was accepted.
    pub fn set_status(&mut self, code: u16) -> bool {
        if status_text(code).is_none() {
            log::warn!("Ignoring unsupported HTTP status code {}", code);
            return false;
        }
        self.status = code;
        true
    }

    pub fn status_text(&self) -> &'static str {
        status_text(self.status).unwrap_or("OK")
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Replace the body with `value` encoded as JSON and switch the content type.
    pub fn set_content_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), HttpError> {
        self.content = serde_json::to_string(value)?;
        self.set_content_type("json", "UTF-8");
        Ok(())
    }

    /// Set `Content-Type` from a short name: `html`, `json`, `css`,
    /// `javascript`, `xml`, `jpeg`/`jpg`, `png`, `text`. Unknown names leave
    /// the header alone; returns whether the name was known.
    pub fn set_content_type(&mut self, kind: &str, charset: &str) -> bool {
        let content_type = match kind.to_lowercase().as_str() {
            "html" => format!("text/html; charset={}", charset),
            "json" => format!("application/json; charset={}", charset),
            "css" => format!("text/css; charset={}", charset),
            "javascript" => format!("application/javascript; charset={}", charset),
            "xml" => format!("text/xml; charset={}", charset),
            "text" => format!("text/plain; charset={}", charset),
            "jpeg" | "jpg" => "image/jpeg".to_string(),
            "png" => "image/png".to_string(),
            _ => return false,
        };
        self.set_header("Content-Type", content_type);
        true
    }

    /// Set a header. Names are normalised (`x_powered_by` becomes `X-Powered-By`).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let name = clean_header_name(name);
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = clean_header_name(name);
        self.headers
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn remove_header(&mut self, name: &str) {
        let name = clean_header_name(name);
        self.headers.retain(|(existing, _)| *existing != name);
    }

    /// Headers in the order they were first set.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Add a cookie, replacing one with the same name.
    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|existing| existing.name != cookie.name);
        self.cookies.push(cookie);
    }

    pub fn remove_cookie(&mut self, name: &str) {
        self.cookies.retain(|existing| existing.name != name);
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    fn set_date_header(&mut self, name: &str, date: &DateTime<Utc>) {
        self.set_header(name, http_date(date));
    }

    /// Clamp and store the max age in seconds (0 to one year).
    pub fn set_max_age(&mut self, age: i64) {
        self.max_age = age.clamp(0, i64::from(MAX_AGE_LIMIT)) as u32;
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    fn cache_control(&self, private: bool) -> String {
        let mut parts = vec![if private { "private" } else { "public" }.to_string()];
        if self.max_age > 0 {
            parts.push(format!("max-age={}", self.max_age));
            if !private {
                parts.push(format!("s-maxage={}", self.max_age));
            }
        }
        if private || self.has_header("Last-Modified") || self.has_header("ETag") {
            parts.push("must-revalidate".to_string());
        }
        parts.join(", ")
    }

    /// Apply one of the canned caching behaviours.
    pub fn set_cache_policy(&mut self, policy: CachePolicy) {
        match policy {
            CachePolicy::Never => {
                self.set_header("Cache-Control", "no-cache, no-store, private, must-revalidate");
                let past = Utc.with_ymd_and_hms(2010, 2, 11, 12, 42, 42).single().unwrap_or_default();
                self.set_date_header("Expires", &past);
                self.remove_header("ETag");
                self.remove_header("Last-Modified");
            }
            CachePolicy::Private | CachePolicy::Public => {
                if self.max_age > 0 {
                    let expires = Utc::now() + Duration::seconds(i64::from(self.max_age));
                    self.set_date_header("Expires", &expires);
                }
                self.set_header("Vary", "Accept-Encoding");
                let cache_control = self.cache_control(policy == CachePolicy::Private);
                self.set_header("Cache-Control", cache_control);
            }
            CachePolicy::Static => {
                self.set_max_age(i64::from(MAX_AGE_LIMIT));
                let cache_control = self.cache_control(false);
                self.set_header("Cache-Control", cache_control);
            }
        }
    }

    /// Set an ETag derived from text that identifies the content.
    /// The same text always gives the same tag.
    pub fn set_etag(&mut self, sample: &str) {
        let digest = Sha256::digest(sample.as_bytes());
        self.set_header("ETag", format!("\"{}\"", hex::encode(digest)));
    }

    pub fn set_last_modified(&mut self, date: &DateTime<Utc>) {
        self.set_date_header("Last-Modified", date);
    }

    /// Compare the request's `If-None-Match` / `If-Modified-Since` with this
    /// response. When every validator the request sent matches, the response
    /// becomes a `304 Not Modified` and true is returned.
    pub fn is_not_modified(&mut self, request: &Request) -> bool {
        let etag = request.headers.get("If-None-Match");
        let last_modified = request.headers.get("If-Modified-Since");

        let etag_matches = || self.header("ETag") == Some(etag.as_str());
        let date_matches = || self.header("Last-Modified") == Some(last_modified.as_str());

        let not_modified = match (etag.is_empty(), last_modified.is_empty()) {
            (false, false) => etag_matches() && date_matches(),
            (false, true) => etag_matches(),
            (true, false) => date_matches(),
            (true, true) => false,
        };

        if not_modified {
            self.set_not_modified();
        }
        not_modified
    }

    /// Turn this into an empty `304` without the content related headers.
    pub fn set_not_modified(&mut self) {
        self.set_status(304);
        self.content.clear();
        for header in [
            "Content-Length",
            "Content-Type",
            "Last-Modified",
            "Content-Encoding",
            "Content-Language",
            "Allow",
        ] {
            self.remove_header(header);
        }
    }

    /// Make this a `302` redirect to `url`.
    pub fn set_redirect_to_url(&mut self, url: &str) {
        self.set_status(302);
        self.set_header("Expires", "Mon, 26 Jul 1997 05:00:00 GMT");
        self.set_header("Location", url);
    }

    /// Redirect to a route. With a request as context the URL is made absolute.
    pub fn set_redirect_to_route(
        &mut self,
        route: &Route,
        args: Option<&serde_json::Map<String, serde_json::Value>>,
        context: Option<&Request>,
    ) -> Result<(), RoutingError> {
        let mut url = route.generate(args)?;
        if let Some(request) = context {
            url = format!("{}{}", request.http_host(), url);
        }
        self.set_redirect_to_url(&url);
        Ok(())
    }

    fn write_head(&self, out: &mut String) {
        for (name, value) in &self.headers {
            let _ = write!(out, "{}: {}\r\n", name, value);
        }
        for cookie in &self.cookies {
            let _ = write!(out, "Set-Cookie: {}\r\n", cookie.to_header_value());
        }
    }

    /// Status line, headers, cookies and body as sent over HTTP/1.1.
    pub fn to_http_string(&self) -> String {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, self.status_text());
        self.write_head(&mut out);
        out.push_str("\r\n");
        out.push_str(&self.content);
        out
    }

    /// The same, framed for a CGI gateway (`Status:` header instead of a status line).
    pub fn to_cgi_string(&self) -> String {
        let mut out = format!("Status: {} {}\r\n", self.status, self.status_text());
        self.write_head(&mut out);
        out.push_str("\r\n");
        out.push_str(&self.content);
        out
    }
}
