//! Response cookies.
use chrono::{DateTime, Duration, Utc};

use crate::http::response::http_date;

// Characters that would break the Set-Cookie syntax
const FORBIDDEN: &[char] = &['=', ',', ';', ' ', '\t', '\r', '\n', '\u{0b}', '\u{0c}'];

/// A cookie to be sent with a response.
///
/// Name and value are stripped of characters that are not allowed in a
/// `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Unix timestamp, `0` for a session cookie.
    pub expire: i64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

fn sanitise(text: &str) -> String {
    text.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}

impl Cookie {
    /// A session cookie on `/`, HTTP only.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: sanitise(name),
            value: sanitise(value),
            expire: 0,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    /// A cookie that tells the browser to forget `name`.
    pub fn removal(name: &str) -> Self {
        Self::new(name, "").with_expire(-1)
    }

    /// Set the expiry timestamp. A negative value means "30 days ago", which
    /// deletes the cookie in the browser.
    pub fn with_expire(mut self, expire: i64) -> Self {
        self.expire = if expire < 0 {
            (Utc::now() - Duration::days(30)).timestamp()
        } else {
            expire
        };
        self
    }

    /// An empty path falls back to `/`.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = if path.is_empty() { "/".to_string() } else { path.to_string() };
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// The value of a `Set-Cookie` header for this cookie.
    pub fn to_header_value(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        if self.expire != 0 {
            if let Some(expires) = DateTime::<Utc>::from_timestamp(self.expire, 0) {
                header.push_str("; expires=");
                header.push_str(&http_date(&expires));
            }
        }
        header.push_str("; path=");
        header.push_str(&self.path);
        if let Some(domain) = &self.domain {
            header.push_str("; domain=");
            header.push_str(domain);
        }
        if self.secure {
            header.push_str("; secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}
