//! Helpers that turn kernel results into terminal or CGI output.
use neatbox_core::http::CachePolicy;
use neatbox_core::{KernelError, Response};

/// How a response is written to standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `HTTP/1.1 <code> <text>` status line, as a server would send it.
    Http,
    /// `Status: <code> <text>` header, as a CGI gateway expects it.
    Cgi,
}

/// Parse a `name=value` request parameter.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

/// The response sent when an error escapes the kernel.
///
/// Details are only shown outside `prod`.
pub fn error_response(error: &KernelError, environment: &str) -> Response {
    let mut content = String::from("<h1>Internal Server Error</h1>\n");
    if environment != "prod" {
        content.push_str(&format!("<pre>{}</pre>\n", error));
    }
    let mut response = Response::with_content(content, 500);
    response.set_cache_policy(CachePolicy::Never);
    response
}

pub fn render(response: &Response, format: OutputFormat) -> String {
    match format {
        OutputFormat::Http => response.to_http_string(),
        OutputFormat::Cgi => response.to_cgi_string(),
    }
}
