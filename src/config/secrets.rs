//! Secrets providers
//!
//! Configuration values are looked up by key through a [`SecretsProvider`].
//! The process environment, a flat TOML file (the `secrets.toml` layout used by
//! hosted deployments) and an in-memory map are supported, and providers can be
//! layered so the first one that knows a key wins.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{RelayError, Result};

/// String and integer lookups with defaults
pub trait SecretsProvider: Send + Sync {
    /// Raw string value for `key`
    fn get_string(&self, key: &str) -> Option<String>;

    /// Integer value for `key`; a present but non-integer value is an error
    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get_string(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|e| {
                RelayError::ConfigurationError(format!("{key} must be an integer ({raw:?}): {e}"))
            }),
        }
    }

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.get_int(key)?.unwrap_or(default))
    }
}

/// Reads the process environment, optionally with a key prefix
#[derive(Debug, Clone, Default)]
pub struct EnvSecrets {
    prefix: Option<String>,
}

impl EnvSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `<prefix><key>` instead of `<key>`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl SecretsProvider for EnvSecrets {
    fn get_string(&self, key: &str) -> Option<String> {
        let name = match &self.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        };
        std::env::var(name).ok()
    }
}

/// Top-level keys of a TOML document
#[derive(Debug, Clone, Default)]
pub struct TomlSecrets {
    table: toml::Table,
}

impl TomlSecrets {
    pub fn parse(source: &str) -> Result<Self> {
        let table = toml::from_str::<toml::Table>(source)?;
        Ok(Self { table })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            RelayError::ConfigurationError(format!(
                "Failed to read secrets file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&source)
    }
}

impl SecretsProvider for TomlSecrets {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.table.get(key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.table.get(key) {
            None => Ok(None),
            Some(toml::Value::Integer(i)) => Ok(Some(*i)),
            Some(toml::Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|e| {
                RelayError::ConfigurationError(format!("{key} must be an integer ({s:?}): {e}"))
            }),
            Some(other) => Err(RelayError::ConfigurationError(format!(
                "{key} must be an integer, found {}",
                other.type_str()
            ))),
        }
    }
}

/// In-memory provider
#[derive(Debug, Clone, Default)]
pub struct MapSecrets {
    values: HashMap<String, String>,
}

impl MapSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSecrets {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretsProvider for MapSecrets {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// First provider that has a value wins
#[derive(Default)]
pub struct LayeredSecrets {
    layers: Vec<Box<dyn SecretsProvider>>,
}

impl LayeredSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, provider: impl SecretsProvider + 'static) -> Self {
        self.layers.push(Box::new(provider));
        self
    }
}

impl std::fmt::Debug for LayeredSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredSecrets")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl SecretsProvider for LayeredSecrets {
    fn get_string(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get_string(key))
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        for layer in &self.layers {
            if let Some(value) = layer.get_int(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
