//! Resolved configuration container
//!
//! `Config` wraps the terminal value tree produced by the loader: no
//! reference markers, no extension declarations. It offers typed access
//! by path and export to YAML/JSON. The loader hands the tree over by
//! value; nothing is shared between resolution calls.

use std::path::Path;

use crate::error::{Error, Result};
use crate::loader::{self, LoadOptions};
use crate::overrides::Overrides;
use crate::resolve;
use crate::value::Value;

/// A fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    /// Wrap an already-resolved value tree
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Load and resolve the document at `path` with the given overrides
    ///
    /// Convenience for [`loader::load`].
    pub fn load(path: impl AsRef<Path>, overrides: &Overrides) -> Result<Self> {
        loader::load(path, overrides)
    }

    /// Parse YAML text and resolve its references
    ///
    /// Extension declarations are not processed here; they need a file
    /// location to resolve against, so use [`Config::load`] for those.
    pub fn from_yaml(yaml: &str, overrides: &Overrides) -> Result<Self> {
        let tree: Value = serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;
        Ok(Self::new(resolve::interpolate(tree, overrides)?))
    }

    /// Load and resolve with explicit options
    pub fn load_with_options(
        path: impl AsRef<Path>,
        overrides: &Overrides,
        options: &LoadOptions,
    ) -> Result<Self> {
        loader::load_with_options(path, overrides, options)
    }

    /// Get the value at a path
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.root.get_path(path)
    }

    /// Get a string value, with scalar coercion if needed
    pub fn get_string(&self, path: &str) -> Result<String> {
        let value = self.get(path)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            _ => Err(Error::type_coercion(path, "string", value.type_name())),
        }
    }

    /// Get an integer value, with string coercion if needed
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.get(path)?;
        match value {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "integer", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "integer", value.type_name())),
        }
    }

    /// Get a float value, with string coercion if needed
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        let value = self.get(path)?;
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "float", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "float", value.type_name())),
        }
    }

    /// Get a boolean value, with strict coercion
    ///
    /// Only case-insensitive "true" and "false" strings coerce; "1",
    /// "yes", and friends are errors.
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.get(path)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::type_coercion(
                    path,
                    "boolean",
                    format!("string (\"{}\") - only \"true\" or \"false\" allowed", s),
                )),
            },
            _ => Err(Error::type_coercion(path, "boolean", value.type_name())),
        }
    }

    /// Borrow the underlying value tree
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume the configuration, returning the value tree
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Export the configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(|e| Error::parse(e.to_string()))
    }

    /// Export the configuration as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root).map_err(|e| Error::parse(e.to_string()))
    }
}

impl From<Value> for Config {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
