//! Parameter bags of a request: query, body, server, cookies, headers, files.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::http::error::HttpError;

/// Integer value of the leading digits of `value`, `0` if there are none.
///
/// Leading whitespace and a sign are accepted; parsing stops at the first
/// non-digit (`"42abc"` is `42`). Overflow saturates.
pub fn leading_int(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut result: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        result = result.saturating_mul(10).saturating_add(i64::from(digit - b'0'));
    }
    if negative { -result } else { result }
}

/// A bag of named string parameters with type-coercing getters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    all: BTreeMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.all
    }

    /// Add one item, replacing any value of the same name.
    pub fn add_item(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.all.insert(name.into(), value.into());
    }

    /// Add many items, replacing values of the same name.
    pub fn add_many<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in items {
            self.add_item(name, value);
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.all.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.all.remove(name)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// The raw value, if present.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.all.get(name).map(String::as_str)
    }

    /// The value of `name`, or `default` when it is missing.
    pub fn get(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or(default).to_string()
    }

    /// Leading integer of the value, or `default` when it is missing.
    pub fn int(&self, name: &str, default: i64) -> i64 {
        self.raw(name).map(leading_int).unwrap_or(default)
    }

    /// Same as [`get`](Self::get); values are always valid UTF-8 text.
    pub fn text(&self, name: &str, default: &str) -> String {
        self.get(name, default)
    }

    /// Only the letters of the value (accented letters included).
    pub fn alpha(&self, name: &str, default: &str) -> String {
        self.get(name, default).chars().filter(|c| c.is_alphabetic()).collect()
    }

    /// Only the letters and digits of the value.
    pub fn alphanum(&self, name: &str, default: &str) -> String {
        self.get(name, default).chars().filter(|c| c.is_alphanumeric()).collect()
    }

    /// Only the ASCII digits of the value.
    pub fn digits(&self, name: &str, default: &str) -> String {
        self.get(name, default).chars().filter(char::is_ascii_digit).collect()
    }

    /// `name:value` lines in name order, as used for request signatures.
    pub fn signature_string(&self) -> String {
        self.all
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.add_many(iter);
        params
    }
}

/// Request headers, taken from the `HTTP_*` and `CONTENT_*` server variables.
///
/// Names are normalised to `Title-Case-With-Dashes`, and lookups normalise
/// the requested name the same way, so `x_forwarded_for` finds
/// `X-Forwarded-For`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    params: RequestParams,
}

impl RequestHeaders {
    /// Extract headers from server variables.
    pub fn from_server(server: &RequestParams) -> Self {
        let mut params = RequestParams::new();
        for (key, value) in server.all() {
            if let Some(name) = key.strip_prefix("HTTP_") {
                params.add_item(clean_header_name(name), value.as_str());
            } else if matches!(key.as_str(), "CONTENT_LENGTH" | "CONTENT_MD5" | "CONTENT_TYPE") {
                params.add_item(clean_header_name(key), value.as_str());
            }
        }

        if let Some(user) = server.raw("PHP_AUTH_USER").or_else(|| server.raw("AUTH_USER")) {
            let password = server.raw("PHP_AUTH_PW").or_else(|| server.raw("AUTH_PW")).unwrap_or_default();
            params.add_item("Auth-User", user);
            params.add_item("Auth-Password", password);
        }
        Self { params }
    }

    pub fn has(&self, name: &str) -> bool {
        self.params.has(&clean_header_name(name))
    }

    /// The header value, or the empty string.
    pub fn get(&self, name: &str) -> String {
        self.params.get(&clean_header_name(name), "")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.params.add_item(clean_header_name(name), value);
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        self.params.all()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// `x_forwarded-FOR` -> `X-Forwarded-For`
pub fn clean_header_name(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// No error, the file was uploaded
pub const UPLOAD_ERR_OK: u32 = 0;
/// No file was uploaded
pub const UPLOAD_ERR_NO_FILE: u32 = 4;

const MAX_UPLOAD_NAME: usize = 100;

/// Metadata of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    path: PathBuf,
    name: String,
    size: u64,
    mime_type: String,
    error: u32,
}

impl UploadedFile {
    /// The original name is sanitised: only letters, digits and `._()-` are
    /// kept, runs of dots collapse, at most the last 100 characters survive
    /// and an empty result becomes `none`. A missing temp file marks the
    /// upload as failed.
    pub fn new(path: impl Into<PathBuf>, name: &str, size: u64, mime_type: impl Into<String>, error: u32) -> Self {
        let path = path.into();
        let error = if path.is_file() { error } else { UPLOAD_ERR_NO_FILE };

        let mut clean = String::with_capacity(name.len());
        for c in name.chars().filter(|c| c.is_alphanumeric() || "._()-".contains(*c)) {
            if c == '.' && clean.ends_with('.') {
                continue;
            }
            clean.push(c);
        }
        let count = clean.chars().count();
        if count > MAX_UPLOAD_NAME {
            clean = clean.chars().skip(count - MAX_UPLOAD_NAME).collect();
        }
        if clean.is_empty() {
            clean = "none".to_string();
        }

        Self { path, name: clean, size, mime_type: mime_type.into(), error }
    }

    pub fn is_valid(&self) -> bool {
        self.error == UPLOAD_ERR_OK
    }

    pub fn original_name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn error(&self) -> u32 {
        self.error
    }

    /// Where the upload is stored, if it is valid.
    pub fn temp_path(&self) -> Option<&Path> {
        self.is_valid().then_some(self.path.as_path())
    }

    /// Move the upload to `target`.
    pub fn move_to(&self, target: &Path) -> Result<(), HttpError> {
        if !self.is_valid() {
            return Err(HttpError::InvalidUpload { name: self.name.clone(), code: self.error });
        }
        let moved = fs::rename(&self.path, target).or_else(|_| {
            // rename fails across filesystems
            fs::copy(&self.path, target).and_then(|_| fs::remove_file(&self.path))
        });
        moved.map_err(|source| HttpError::UploadMove {
            name: self.name.clone(),
            target: target.to_path_buf(),
            source,
        })
    }
}

/// Uploaded files by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFiles {
    files: BTreeMap<String, UploadedFile>,
}

impl RequestFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, file: UploadedFile) {
        self.files.insert(field.into(), file);
    }

    pub fn get(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.files.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadedFile)> {
        self.files.iter().map(|(field, file)| (field.as_str(), file))
    }
}
