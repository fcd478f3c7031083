//! The incoming request.
use std::cell::RefCell;
use std::io::Read;

use chrono::Utc;
use url::{Url, form_urlencoded};

use crate::http::error::HttpError;
use crate::http::params::{RequestFiles, RequestHeaders, RequestParams};
use crate::http::session::SharedSession;

const DEFAULT_USER_AGENT: &str = "Neatbox/1.0";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// An HTTP request as seen by the kernel.
///
/// Built either from the CGI environment ([`Request::from_cgi`]) or
/// synthetically ([`Request::create`]). All inputs live in parameter bags;
/// everything else (path, host, scheme, ...) is derived from the `server` bag.
#[derive(Debug, Clone)]
pub struct Request {
    pub query: RequestParams,
    pub body: RequestParams,
    pub server: RequestParams,
    pub cookies: RequestParams,
    pub headers: RequestHeaders,
    pub files: RequestFiles,
    session: RefCell<Option<SharedSession>>,
    trust_proxy: bool,
}

fn parse_form(data: &str) -> RequestParams {
    form_urlencoded::parse(data.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

fn parse_cookie_header(header: &str) -> RequestParams {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn is_on(value: &str) -> bool {
    value.eq_ignore_ascii_case("on") || value == "1"
}

impl Request {
    pub fn new(
        query: RequestParams,
        body: RequestParams,
        server: RequestParams,
        cookies: RequestParams,
        files: RequestFiles,
    ) -> Self {
        let headers = RequestHeaders::from_server(&server);
        Self {
            query,
            body,
            server,
            cookies,
            headers,
            files,
            session: RefCell::new(None),
            trust_proxy: false,
        }
    }

    /// Build a request for `uri` as a browser would send it.
    ///
    /// Relative URIs are resolved against `http://localhost`. For `POST`,
    /// `PUT` and `DELETE` the parameters form the body, otherwise they are
    /// merged over the query string of `uri`.
    pub fn try_create(uri: &str, method: &str, params: &[(&str, &str)]) -> Result<Self, HttpError> {
        let method = method.trim().to_uppercase();
        if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(HttpError::InvalidMethod { method });
        }

        let parsed = match Url::parse(uri) {
            Ok(url) => url,
            Err(_) => Url::parse("http://localhost")
                .and_then(|base| base.join(uri))
                .map_err(|e| HttpError::InvalidUri {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                })?,
        };

        let mut server = RequestParams::new();
        server.add_many([
            ("SERVER_NAME", "localhost"),
            ("SERVER_PORT", "80"),
            ("HTTP_HOST", "localhost"),
            ("HTTP_USER_AGENT", DEFAULT_USER_AGENT),
            ("HTTP_ACCEPT", DEFAULT_ACCEPT),
            ("REMOTE_ADDR", "127.0.0.1"),
            ("SERVER_PROTOCOL", "HTTP/1.1"),
        ]);
        server.add_item("REQUEST_TIME", Utc::now().timestamp().to_string());
        server.add_item("REQUEST_METHOD", method.as_str());

        if parsed.scheme() == "https" {
            server.add_item("HTTPS", "on");
            server.add_item("SERVER_PORT", "443");
        }
        if let Some(host) = parsed.host_str() {
            server.add_item("SERVER_NAME", host);
            match parsed.port() {
                Some(port) => {
                    server.add_item("SERVER_PORT", port.to_string());
                    server.add_item("HTTP_HOST", format!("{}:{}", host, port));
                }
                None => server.add_item("HTTP_HOST", host),
            }
        }

        let mut query = parse_form(parsed.query().unwrap_or_default());
        let mut body = RequestParams::new();
        if matches!(method.as_str(), "POST" | "PUT" | "DELETE") {
            body.add_many(params.iter().copied());
            server.add_item("CONTENT_TYPE", "application/x-www-form-urlencoded");
        } else {
            query.add_many(params.iter().copied());
        }

        let query_string = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.all())
            .finish();
        let path = parsed.path().to_string();
        let request_uri = if query_string.is_empty() {
            path.clone()
        } else {
            format!("{}?{}", path, query_string)
        };

        server.add_item("QUERY_STRING", query_string);
        server.add_item("REQUEST_URI", request_uri);
        server.add_item("REDIRECT_URL", path);
        server.add_item("PATH_INFO", "");

        Ok(Self::new(query, body, server, RequestParams::new(), RequestFiles::new()))
    }

    /// Like [`try_create`](Self::try_create), falling back to a `GET /`
    /// request when the method or URI is malformed.
    pub fn create(uri: &str, method: &str, params: &[(&str, &str)]) -> Self {
        Self::try_create(uri, method, params).unwrap_or_else(|e| {
            log::warn!("Could not build request for {} {}: {}", method, uri, e);
            Self::try_create("/", "GET", &[]).unwrap_or_else(|_| {
                Self::new(
                    RequestParams::new(),
                    RequestParams::new(),
                    RequestParams::new(),
                    RequestParams::new(),
                    RequestFiles::new(),
                )
            })
        })
    }

    /// Build the request from CGI variables and an already read body.
    pub fn from_cgi_parts<I, K, V>(vars: I, body: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let server: RequestParams = vars.into_iter().collect();
        let query = parse_form(&server.get("QUERY_STRING", ""));
        let cookies = parse_cookie_header(&server.get("HTTP_COOKIE", ""));

        let content_type = server.get("CONTENT_TYPE", "");
        let body = if content_type.starts_with("application/x-www-form-urlencoded") {
            parse_form(body)
        } else {
            RequestParams::new()
        };

        Self::new(query, body, server, cookies, RequestFiles::new())
    }

    /// Build the request from the process environment and standard input,
    /// the way a CGI gateway hands it over.
    pub fn from_cgi() -> Result<Self, HttpError> {
        let vars: Vec<(String, String)> = std::env::vars().collect();
        let length = vars
            .iter()
            .find(|(name, _)| name == "CONTENT_LENGTH")
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let mut body = String::new();
        if length > 0 {
            std::io::stdin()
                .take(length)
                .read_to_string(&mut body)
                .map_err(HttpError::BodyRead)?;
        }
        Ok(Self::from_cgi_parts(vars, &body))
    }

    /// Honour `X-Forwarded-*` and `X-Front-End-Https` headers. Only enable
    /// this behind a proxy you control.
    pub fn set_trust_proxy(&mut self, trust: bool) {
        self.trust_proxy = trust;
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    /// The upper-cased request method, `GET` when unknown.
    pub fn method(&self) -> String {
        self.server.get("REQUEST_METHOD", "GET").to_uppercase()
    }

    /// The request URI including the query string.
    pub fn uri(&self) -> String {
        self.server.get("REQUEST_URI", "")
    }

    /// The path without query string, still URL-encoded.
    pub fn path(&self) -> String {
        let redirect = self.server.get("REDIRECT_URL", "");
        if !redirect.is_empty() {
            return redirect;
        }
        let path_info = self.server.get("PATH_INFO", "");
        if !path_info.is_empty() {
            return path_info;
        }
        let uri = self.uri();
        match uri.split_once('?') {
            Some((path, _)) => path.to_string(),
            None => uri,
        }
    }

    /// The host name without port, lower-cased.
    pub fn host(&self) -> String {
        let forwarded = self.headers.get("X-Forwarded-Host");
        let host = if self.trust_proxy && !forwarded.is_empty() {
            forwarded.rsplit(',').next().unwrap_or_default().to_string()
        } else if self.headers.has("Host") {
            self.headers.get("Host")
        } else if self.server.has("SERVER_NAME") {
            self.server.get("SERVER_NAME", "")
        } else {
            self.server.get("SERVER_ADDR", "")
        };

        let host = host.trim();
        let host = match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        };
        host.to_lowercase()
    }

    pub fn is_secure(&self) -> bool {
        if is_on(&self.server.get("HTTPS", "")) || is_on(&self.server.get("SSL_HTTPS", "")) {
            return true;
        }
        self.trust_proxy
            && (is_on(&self.headers.get("X-Front-End-Https"))
                || self.headers.get("X-Forwarded-Proto").eq_ignore_ascii_case("https"))
    }

    pub fn scheme(&self) -> &'static str {
        if self.is_secure() { "https" } else { "http" }
    }

    pub fn port(&self) -> u16 {
        if self.trust_proxy {
            let forwarded = self.headers.get("X-Forwarded-Port");
            if let Ok(port) = forwarded.trim().parse() {
                return port;
            }
            if is_on(&self.headers.get("X-Front-End-Https")) {
                return 443;
            }
        }
        self.server
            .raw("SERVER_PORT")
            .and_then(|port| port.trim().parse().ok())
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    /// `scheme://host`, with the port when it is not the scheme's default.
    pub fn http_host(&self) -> String {
        let scheme = self.scheme();
        let port = self.port();
        let default_port = if scheme == "https" { 443 } else { 80 };
        if port == default_port {
            format!("{}://{}", scheme, self.host())
        } else {
            format!("{}://{}:{}", scheme, self.host(), port)
        }
    }

    /// The client address. Proxy headers are only consulted when trusted.
    pub fn client_ip(&self) -> String {
        if self.trust_proxy {
            let client = self.headers.get("Client-Ip");
            if !client.is_empty() {
                return client.trim().to_string();
            }
            let forwarded = self.headers.get("X-Forwarded-For");
            if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                return first.to_string();
            }
        }
        self.server.get("REMOTE_ADDR", "")
    }

    pub fn is_ajax(&self) -> bool {
        self.headers.get("X-Requested-With") == "XMLHttpRequest"
    }

    pub fn has_session(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn session(&self) -> Option<SharedSession> {
        self.session.borrow().clone()
    }

    /// Attach the session. Works on a shared request.
    pub fn set_session(&self, session: SharedSession) {
        *self.session.borrow_mut() = Some(session);
    }
}
