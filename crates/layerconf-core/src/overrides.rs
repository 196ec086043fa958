//! External override values
//!
//! A flat mapping from dotted-path string to scalar value, typically
//! produced by the CLI flag parser at the program boundary. The engine
//! never mutates it; during interpolation an override shadows any
//! document-internal value at the same path.

use indexmap::IndexMap;

use crate::value::Value;

/// Caller-supplied override values, keyed by dotted path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    entries: IndexMap<String, Value>,
}

impl Overrides {
    /// Create an empty overrides mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an override value for a dotted path
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(path.into(), value.into());
    }

    /// Insert raw flag text, coercing it to a typed scalar
    ///
    /// Flag values arrive as text; coercion keeps them interchangeable
    /// with typed document values: "true"/"false" become booleans,
    /// integer and float literals become numbers, everything else stays
    /// a string.
    pub fn insert_raw(&mut self, path: impl Into<String>, raw: &str) {
        self.entries.insert(path.into(), coerce_scalar(raw));
    }

    /// Look up an override by its exact dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Check if there are no overrides
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of override entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over (path, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl From<IndexMap<String, Value>> for Overrides {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for Overrides {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Coerce raw flag text to a typed scalar
fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    Value::String(raw.to_string())
}
