//! Application configuration for the Trellis framework.
//!
//! [`Config`] is an immutable string-keyed mapping. A key only counts as
//! present when its value is non-empty, so `null`, `false`, `0`, `""`, `"0"`
//! and collections holding nothing but such values behave like missing keys.
//!
//! ```
//! use serde_json::json;
//! use trellis_config::Config;
//!
//! let config = Config::from_value(json!({
//!     "displayErrors": 0,
//!     "view": { "scriptRootPath": "templates" },
//! }))
//! .unwrap();
//!
//! assert!(!config.has("displayErrors"));
//! assert_eq!(config.get("view").unwrap()["scriptRootPath"], "templates");
//! ```

pub mod env;
pub mod error;
pub mod loader;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ops::Index;
use std::path::{Path, PathBuf};
use tracing::debug;

static NULL: Value = Value::Null;

/// Immutable configuration container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    data: Map<String, Value>,
}

impl Config {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Build from a JSON value whose root must be an object (or null).
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            Value::Null => Ok(Self::default()),
            _ => Err(ConfigError::ParseError(
                "Configuration root must be an object".to_string(),
            )),
        }
    }

    /// Load a single file, detecting the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigBuilder::new().file(path).build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Whether `key` holds a non-empty value.
    pub fn has(&self, key: &str) -> bool {
        match self.data.get(key) {
            Some(value) => !is_empty(value) && !all_empty(value),
            None => false,
        }
    }

    /// The value for `key`, when [`has`](Self::has) is true.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if self.has(key) {
            self.data.get(key)
        } else {
            None
        }
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// The value for `key`, failing when it is missing or empty.
    pub fn get_required(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Deserialize the value for `key`; `Ok(None)` when absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ConfigError::DeserializationError {
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                })
            })
            .transpose()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.has(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// All raw entries, including empty ones.
    pub fn all(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Index<&str> for Config {
    type Output = Value;

    /// Yields `Value::Null` for missing or empty keys.
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl From<Map<String, Value>> for Config {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

impl TryFrom<Value> for Config {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// `empty()` in the loose sense used by configuration lookups.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Whether every value inside a collection is empty, recursively.
pub fn all_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|v| is_empty(v) || all_empty(v)),
        Value::Object(map) => map.values().all(|v| is_empty(v) || all_empty(v)),
        other => is_empty(other),
    }
}

enum Source {
    File(PathBuf, Option<FileFormat>),
    Env(Option<String>),
    Dotenv(Option<PathBuf>),
    Value(String, Value),
}

/// Builds a [`Config`] from several sources; later sources override
/// earlier ones key by key.
#[derive(Default)]
pub struct ConfigBuilder {
    sources: Vec<Source>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file whose format is detected from its extension.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.sources
            .push(Source::File(path.as_ref().to_path_buf(), None));
        self
    }

    pub fn file_with_format(mut self, path: impl AsRef<Path>, format: FileFormat) -> Self {
        self.sources
            .push(Source::File(path.as_ref().to_path_buf(), Some(format)));
        self
    }

    /// Read environment variables starting with `{prefix}_`.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sources.push(Source::Env(Some(prefix.into())));
        self
    }

    /// Load a `.env` file into the process environment before reading
    /// environment variables. Missing default `.env` files are ignored.
    pub fn dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.sources.push(Source::Dotenv(path));
        self
    }

    pub fn set<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.sources.push(Source::Value(key.into(), value));
        Ok(self)
    }

    pub fn build(self) -> Result<Config> {
        let mut data = Map::new();

        for source in self.sources {
            match source {
                Source::File(path, format) => {
                    let loader = match format {
                        Some(format) => ConfigLoader::new(format),
                        None => ConfigLoader::auto(&path)?,
                    };
                    let map = loader.load_file(&path)?;
                    debug!(path = %path.display(), keys = map.len(), "Loaded configuration file");
                    data.extend(map);
                }
                Source::Env(prefix) => {
                    let vars = EnvLoader::new(prefix).load();
                    debug!(keys = vars.len(), "Loaded configuration from environment");
                    data.extend(vars.into_iter().map(|(k, v)| (k, Value::String(v))));
                }
                Source::Dotenv(Some(path)) => {
                    dotenvy::from_path(&path)
                        .map_err(|e| ConfigError::LoadError(e.to_string()))?;
                }
                Source::Dotenv(None) => {
                    dotenvy::dotenv().ok();
                }
                Source::Value(key, value) => {
                    data.insert(key, value);
                }
            }
        }

        Ok(Config::new(data))
    }
}
