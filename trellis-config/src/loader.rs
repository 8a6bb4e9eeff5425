// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of a file from its extension (`.env` files included).
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .or_else(|| {
                path.file_name()
                    .and_then(|s| s.to_str())
                    .filter(|name| *name == ".env")
                    .map(|_| "env")
            })
            .ok_or_else(|| {
                ConfigError::LoadError(format!("No file extension found: {}", path.display()))
            })?;

        Self::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))
    }
}

/// Parses configuration documents into a JSON object tree.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        FileFormat::detect(path.as_ref()).map(Self::new)
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load a file; the document root must be a table/object.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<serde_json::Map<String, Value>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match self.parse(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(ConfigError::ParseError(format!(
                "Expected a table at the root of {}, found {}",
                path.display(),
                kind_of(&other)
            ))),
        }
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => parse_json(content),
            FileFormat::Toml => parse_toml(content),
            FileFormat::Env => Ok(parse_env(content)),
        }
    }
}

fn parse_json(content: &str) -> Result<Value> {
    serde_json::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
}

fn parse_toml(content: &str) -> Result<Value> {
    let toml_value: toml::Value = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    serde_json::to_value(toml_value)
        .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e)))
}

fn parse_env(content: &str) -> Value {
    let mut map = serde_json::Map::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(
                crate::env::to_config_key(key.trim()),
                Value::String(value.to_string()),
            );
        }
    }

    Value::Object(map)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader.parse(r#"{"key": "value", "number": 42}"#).unwrap();
        assert_eq!(result["number"], 42);
    }

    #[test]
    fn test_parse_toml_tables() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            displayErrors = true

            [router]
            defaultController = "home"

            [router.routes."/login"]
            defaults = { controller = "auth", action = "login" }
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["displayErrors"], true);
        assert_eq!(result["router"]["defaultController"], "home");
        assert_eq!(result["router"]["routes"]["/login"]["defaults"]["action"], "login");
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = r#"
            ERROR_PAGE_PATH=/var/www/error.html
            # Comment
            export EDITOR="vscode"
            DISPLAY_ERRORS='0'
        "#;

        let result = loader.parse(env).unwrap();
        assert_eq!(result["errorPagePath"], "/var/www/error.html");
        assert_eq!(result["editor"], "vscode");
        assert_eq!(result["displayErrors"], "0");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert_eq!(FileFormat::detect(Path::new("config/.env")).unwrap(), FileFormat::Env);
        assert!(FileFormat::detect(Path::new("config/app")).is_err());
    }
}
