//! Per-request mutable state.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

/// Request Context: the key-value state one request carries through its
/// pipeline.
///
/// The transport seeds it with path and query parameters (as strings). Hooks
/// may write derived values for later hooks and the terminal action to read:
///
/// ```rust
/// use railyard::Context;
///
/// let mut ctx = Context::from_params([("index", "3")]);
/// let index: u32 = ctx.param_as("index").unwrap();
/// ctx.insert("page_index", index);
/// assert_eq!(ctx.get("page_index"), Some(&serde_json::json!(3)));
/// ```
///
/// A context is owned by exactly one request. It moves through the pipeline
/// by value and is dropped once the response exists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from string parameters.
    pub fn from_params<K, V>(params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = params
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a value as `&str` if it is a JSON string.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Parses a value into `T`. Strings are parsed with [`FromStr`]; any other
    /// JSON value is parsed from its textual form (`3` → `"3"` → `3u32`).
    pub fn param_as<T: FromStr>(&self, key: &str) -> Option<T> {
        match self.values.get(key)? {
            Value::String(s) => s.parse().ok(),
            other => other.to_string().parse().ok(),
        }
    }

    /// Stores a value, replacing any previous one under `key`. Values that
    /// fail to serialise are stored as `null`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
