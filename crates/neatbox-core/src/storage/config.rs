use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::kernel::error::Result;
use crate::kernel::resource::ResourceLocator;
use crate::storage::error::StorageSystemError;

/// Key whose value names further config resources to load first.
pub const IMPORT_KEY: &str = "import";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Parse `data` into a generic value tree.
    pub fn parse(&self, data: &str) -> Result<Value> {
        let parsed = match self {
            ConfigFormat::Json => serde_json::from_str::<Value>(data).map_err(boxed),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str::<Value>(data).map_err(boxed),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str::<Value>(data).map_err(boxed),
        };
        parsed.map_err(|source| {
            StorageSystemError::DeserializationError {
                format: self.extension().to_string(),
                source,
            }
            .into()
        })
    }
}

fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

/// Read and parse a config file, picking the format from its extension.
pub fn read_value(path: &Path) -> Result<Value> {
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| StorageSystemError::UnsupportedConfigFormat(path.display().to_string()))?;
    if !path.is_file() {
        return Err(StorageSystemError::FileNotFound(path.to_path_buf()).into());
    }
    let data = fs::read_to_string(path)
        .map_err(|e| StorageSystemError::io(e, "read_config", path.to_path_buf()))?;
    format.parse(&data)
}

/// Application configuration.
///
/// Nested maps are flattened into dot separated, lower-cased keys, so
/// `Database: { Host: x }` is read back as `database.host`. Lists and
/// scalars are kept as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSettings {
    values: Map<String, Value>,
    sources: Vec<PathBuf>,
}

impl ConfigSettings {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `package:group:file` config resource, following `import` keys.
    ///
    /// Imported resources are loaded first so the importing file overrides
    /// them. An import cycle is reported as
    /// [`StorageSystemError::CircularImport`].
    pub fn load(locator: &ResourceLocator, resource: &str) -> Result<Self> {
        let mut settings = Self::new();
        let mut stack = Vec::new();
        settings.load_resource(locator, resource, &mut stack)?;
        Ok(settings)
    }

    /// Load a single file without resource resolution or imports.
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut settings = Self::new();
        let value = read_value(path)?;
        settings.merge_document(path, value)?;
        settings.sources.push(path.to_path_buf());
        Ok(settings)
    }

    /// Build settings from an in-memory document.
    pub fn parse_str(data: &str, format: ConfigFormat) -> Result<Self> {
        let mut settings = Self::new();
        settings.merge_document(Path::new("<memory>"), format.parse(data)?)?;
        Ok(settings)
    }

    fn load_resource(&mut self, locator: &ResourceLocator, resource: &str, stack: &mut Vec<PathBuf>) -> Result<()> {
        let path = locator.find_resource(resource, "config")?;
        if stack.contains(&path) {
            log::error!("Circular config import of '{}'", path.display());
            return Err(StorageSystemError::CircularImport { path }.into());
        }

        log::debug!("Loading config resource '{}' from '{}'", resource, path.display());
        let mut document = read_value(&path)?;

        stack.push(path.clone());
        if let Some(imports) = document.as_object_mut().and_then(|map| map.remove(IMPORT_KEY)) {
            for import in import_list(&path, imports)? {
                self.load_resource(locator, &import, stack)?;
            }
        }
        stack.pop();

        self.merge_document(&path, document)?;
        self.sources.push(path);
        Ok(())
    }

    fn merge_document(&mut self, path: &Path, document: Value) -> Result<()> {
        match document {
            // An empty file parses to null
            Value::Null => Ok(()),
            Value::Object(map) => {
                flatten_into(&mut self.values, "", map);
                Ok(())
            }
            other => Err(StorageSystemError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("expected a map at the top level, found {}", kind_of(&other)),
            }
            .into()),
        }
    }

    /// Files that contributed to this configuration, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Get a raw configuration value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_lowercase())
    }

    /// Get a configuration value deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Every key below `prefix`, with the prefix stripped.
    pub fn section(&self, prefix: &str) -> Map<String, Value> {
        let prefix = format!("{}.", prefix.to_lowercase());
        self.values
            .iter()
            .filter_map(|(key, value)| key.strip_prefix(&prefix).map(|rest| (rest.to_string(), value.clone())))
            .collect()
    }

    /// Set a configuration value. Maps are flattened below `key`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let key = key.to_lowercase();
        match value.into() {
            Value::Object(map) => flatten_into(&mut self.values, &key, map),
            other => {
                self.values.insert(key, other);
            }
        }
    }

    /// Remove a configuration value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(&key.to_lowercase())
    }

    /// Check if key exists
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_lowercase())
    }

    /// Get all keys in load order
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge with another config, overriding existing values
    pub fn merge(&mut self, other: &ConfigSettings) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
        self.sources.extend(other.sources.iter().cloned());
    }
}

fn flatten_into(target: &mut Map<String, Value>, prefix: &str, map: Map<String, Value>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.to_lowercase()
        } else {
            format!("{}.{}", prefix, key.to_lowercase())
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(target, &key, nested),
            other => {
                target.insert(key, other);
            }
        }
    }
}

fn import_list(path: &Path, imports: Value) -> Result<Vec<String>> {
    match imports {
        Value::Null => Ok(Vec::new()),
        Value::String(import) => Ok(vec![import]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(import) => Ok(import),
                other => Err(invalid_import(path, &other)),
            })
            .collect(),
        other => Err(invalid_import(path, &other)),
    }
}

fn invalid_import(path: &Path, value: &Value) -> crate::kernel::error::Error {
    StorageSystemError::InvalidConfig {
        path: path.to_path_buf(),
        reason: format!("'{}' entries must be strings, found {}", IMPORT_KEY, kind_of(value)),
    }
    .into()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
