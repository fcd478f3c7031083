//! A single route: pattern compiler, matcher and reverse generator.
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::http::params::leading_int;
use crate::http::request::Request;
use crate::routing::error::RoutingError;

/// Methods accepted when a route does not say otherwise.
pub const DEFAULT_METHODS: &str = "GET|POST|PUT|DELETE|HEAD";
/// Protocols accepted when a route does not say otherwise.
pub const DEFAULT_PROTOCOLS: &str = "http|https";

const OPTIONAL_MARKER: &str = "::";

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
    // Placeholder names in the order they appear in the url
    vars: Vec<String>,
    // Capture group index of each placeholder
    groups: Vec<usize>,
}

/// One URL pattern mapped to a controller action.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    url: String,
    options: Map<String, Value>,
    placeholders: HashMap<String, String>,
    defaults: Map<String, Value>,
    compiled: OnceCell<CompiledPattern>,
    target: OnceCell<Option<(String, String)>>,
    matched: RefCell<Map<String, Value>>,
}

// Finds `{name}` tokens: (start, end, name)
fn scan_placeholders(text: &str) -> Vec<(usize, usize, &str)> {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some(open) = text[offset..].find('{').map(|i| i + offset) {
        let rest = &text[open + 1..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len > 0 && rest[len..].starts_with('}') {
            let end = open + 1 + len + 1;
            found.push((open, end, &rest[..len]));
            offset = end;
        } else {
            offset = open + 1;
        }
    }
    found
}

fn type_regex(kind: &str) -> &str {
    match kind {
        "int" => "[0-9]+",
        "slug" => "[a-zA-Z0-9-]+",
        "alphanum" => "[a-zA-Z0-9]+",
        "alpha" => "[a-zA-Z]+",
        "text" => "[^/]+",
        raw => raw,
    }
}

fn is_builtin_type(kind: &str) -> bool {
    matches!(kind, "int" | "slug" | "alphanum" | "alpha" | "text")
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn value_to_int(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::Bool(flag) => i64::from(*flag),
        Value::String(text) => leading_int(text),
        _ => 0,
    }
}

fn url_encode(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

impl Route {
    /// A route with no options, placeholders or defaults.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::from_parts(name, url, Map::new(), HashMap::new(), Map::new())
    }

    pub fn from_parts(
        name: impl Into<String>,
        url: impl Into<String>,
        options: Map<String, Value>,
        placeholders: HashMap<String, String>,
        defaults: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            options,
            placeholders,
            defaults,
            compiled: OnceCell::new(),
            target: OnceCell::new(),
            matched: RefCell::new(Map::new()),
        }
    }

    pub fn with_option(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self.target = OnceCell::new();
        self
    }

    pub fn with_placeholder(mut self, name: &str, kind: &str) -> Self {
        self.placeholders.insert(name.to_string(), kind.to_string());
        self.compiled = OnceCell::new();
        self
    }

    pub fn with_default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn placeholders(&self) -> &HashMap<String, String> {
        &self.placeholders
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// A named option, if the route has it.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// A named option as text.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Pipe separated list of accepted methods.
    pub fn method(&self) -> &str {
        self.option_str("method").unwrap_or(DEFAULT_METHODS)
    }

    /// Pipe separated list of accepted protocols.
    pub fn protocol(&self) -> &str {
        self.option_str("protocol").unwrap_or(DEFAULT_PROTOCOLS)
    }

    fn target(&self) -> Option<&(String, String)> {
        self.target
            .get_or_init(|| {
                let controller = self.option_str("controller")?;
                let mut parts = controller.split(':');
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(package), Some(class), Some(action), None)
                        if !package.is_empty() && !class.is_empty() && !action.is_empty() =>
                    {
                        Some((format!("{}::controllers::{}", package, class), format!("{}Action", action)))
                    }
                    _ => None,
                }
            })
            .as_ref()
    }

    /// Controller id, `package::controllers::Controller`.
    pub fn controller(&self) -> Result<&str, RoutingError> {
        self.target().map(|(controller, _)| controller.as_str()).ok_or_else(|| self.invalid_controller())
    }

    /// Action id, `nameAction`.
    pub fn action(&self) -> Result<&str, RoutingError> {
        self.target().map(|(_, action)| action.as_str()).ok_or_else(|| self.invalid_controller())
    }

    fn invalid_controller(&self) -> RoutingError {
        RoutingError::InvalidController {
            route: self.name.clone(),
            controller: self.option_str("controller").unwrap_or_default().to_string(),
        }
    }

    fn placeholder_type(&self, name: &str) -> &str {
        self.placeholders.get(name).map(String::as_str).unwrap_or("text")
    }

    fn compiled(&self) -> Result<&CompiledPattern, RoutingError> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let compiled = self.compile()?;
        Ok(self.compiled.get_or_init(|| compiled))
    }

    fn compile(&self) -> Result<CompiledPattern, RoutingError> {
        let invalid = |reason: String| RoutingError::InvalidPattern { route: self.name.clone(), reason };

        let mut source = String::from("^");
        let mut vars = Vec::new();
        let mut groups = Vec::new();
        let mut next_group = 1;

        let (head, tail) = match self.url.split_once(OPTIONAL_MARKER) {
            Some((head, tail)) => (head, Some(tail)),
            None => (self.url.as_str(), None),
        };

        let mut segments = vec![(head, false)];
        if let Some(tail) = tail {
            segments.push((tail, true));
        }

        for (segment, optional) in segments {
            if optional {
                source.push_str("(?:");
            }
            let mut last = 0;
            for (start, end, var) in scan_placeholders(segment) {
                source.push_str(&regex::escape(&segment[last..start]));

                let kind = self.placeholder_type(var);
                let fragment = type_regex(kind);
                let inner_groups = if is_builtin_type(kind) {
                    0
                } else {
                    Regex::new(fragment)
                        .map_err(|e| invalid(format!("placeholder '{}': {}", var, e)))?
                        .captures_len()
                        - 1
                };

                source.push('(');
                source.push_str(fragment);
                source.push(')');
                vars.push(var.to_string());
                groups.push(next_group);
                next_group += 1 + inner_groups;
                last = end;
            }
            source.push_str(&regex::escape(&segment[last..]));
            if optional {
                source.push_str(")?");
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
        log::trace!("Compiled route '{}' to {}", self.name, source);
        Ok(CompiledPattern { source, regex, vars, groups })
    }

    /// The anchored regex that matches this route's paths. Compiled once.
    pub fn regex(&self) -> Result<&str, RoutingError> {
        Ok(&self.compiled()?.source)
    }

    /// Placeholder names in url order.
    pub fn vars(&self) -> Result<&[String], RoutingError> {
        Ok(&self.compiled()?.vars)
    }

    /// Test the url-decoded `path` and the request's method and scheme
    /// against this route.
    ///
    /// On success the matched arguments are remembered (see
    /// [`arguments`](Self::arguments)); on failure they are left alone.
    pub fn is_match(&self, path: &str, request: &Request) -> bool {
        let compiled = match self.compiled() {
            Ok(compiled) => compiled,
            Err(e) => {
                log::warn!("{}", e);
                return false;
            }
        };
        let Some(captures) = compiled.regex.captures(path) else {
            return false;
        };

        let method = request.method();
        if !self.method().split('|').any(|m| m.trim().eq_ignore_ascii_case(&method)) {
            return false;
        }
        let scheme = request.scheme();
        if !self.protocol().split('|').any(|p| p.trim().eq_ignore_ascii_case(scheme)) {
            return false;
        }

        let mut arguments = Map::new();
        for (var, group) in compiled.vars.iter().zip(&compiled.groups) {
            if let Some(default) = self.defaults.get(var) {
                arguments.insert(var.clone(), default.clone());
            }
            if let Some(capture) = captures.get(*group) {
                let value = if self.placeholder_type(var) == "int" {
                    Value::from(leading_int(capture.as_str()))
                } else {
                    Value::from(capture.as_str())
                };
                arguments.insert(var.clone(), value);
            }
        }

        *self.matched.borrow_mut() = arguments;
        true
    }

    /// Arguments of the last successful match, in placeholder order.
    pub fn arguments(&self) -> Map<String, Value> {
        self.matched.borrow().clone()
    }

    /// One value per placeholder in url order, `null` where the last match
    /// had neither a capture nor a default.
    pub fn argument_values(&self) -> Vec<Value> {
        let Ok(vars) = self.vars() else {
            return Vec::new();
        };
        let matched = self.matched.borrow();
        vars.iter()
            .map(|var| matched.get(var).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn clean_argument(value: &Value, kind: &str) -> String {
        if kind == "int" {
            value_to_int(value).to_string()
        } else {
            url_encode(&value_to_string(value))
        }
    }

    /// Build a url for this route.
    ///
    /// Without `args` the arguments of the last match are used. Placeholders
    /// missing from `args` take their default, or a dummy value (`0` for
    /// `int`, `none` otherwise). Arguments that are not placeholders are
    /// appended as a query string.
    pub fn generate(&self, args: Option<&Map<String, Value>>) -> Result<String, RoutingError> {
        let compiled = self.compiled()?;
        let matched;
        let args = match args {
            Some(args) => args,
            None => {
                matched = self.arguments();
                &matched
            }
        };

        let mut path = self.url.replacen(OPTIONAL_MARKER, "", 1);
        for var in &compiled.vars {
            let kind = self.placeholder_type(var);
            let value = match args.get(var) {
                Some(value) => Self::clean_argument(value, kind),
                None => match self.defaults.get(var) {
                    Some(default) if !default.is_null() => Self::clean_argument(default, kind),
                    _ if kind == "int" => "0".to_string(),
                    _ => "none".to_string(),
                },
            };
            path = path.replace(&format!("{{{}}}", var), &value);
        }

        let query: Vec<String> = args
            .iter()
            .filter(|(name, _)| !compiled.vars.iter().any(|var| var == *name))
            .map(|(name, value)| format!("{}={}", url_encode(name), url_encode(&value_to_string(value))))
            .collect();
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }

        Ok(path)
    }
}
