// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::BTreeMap;
use std::env;

/// Reads prefixed environment variables as configuration entries.
///
/// `APP_ERROR_PAGE_PATH` with prefix `APP` becomes the key `errorPagePath`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables
    pub fn load(&self) -> BTreeMap<String, String> {
        self.load_from(env::vars())
    }

    fn load_from<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = BTreeMap::new();

        for (key, value) in vars {
            let name = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => &rest[1..],
                    _ => continue,
                },
                None => key.as_str(),
            };

            if !name.is_empty() {
                config.insert(to_config_key(name), value);
            }
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Convert `SCREAMING_SNAKE_CASE` into the `lowerCamelCase` keys used by
/// application configuration.
pub fn to_config_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == '_' {
            upper_next = !key.is_empty();
        } else if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.extend(c.to_lowercase());
        }
    }

    key
}
