//! Per-node configuration: typed values parsed from the declarative document.
//!
//! Config values are typed by the loader (booleans, integers, floats, strings,
//! lists, nested maps). Modules read them by key with a typed default via
//! [`Config::get_or`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed configuration value.
///
/// Deserialization is untagged, so YAML scalars map to the narrowest matching
/// variant (`true` → `Bool`, `3` → `Int`, `3.5` → `Float`, anything else →
/// `String`); sequences and maps nest recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float accessor; integers widen losslessly enough for config purposes.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        ConfigValue::Int(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

/// Conversion from a borrowed [`ConfigValue`] into a concrete Rust type.
///
/// Returns `None` on a type mismatch, which [`Config::get_or`] treats the
/// same as a missing key.
pub trait FromConfigValue: Sized {
    fn from_value(value: &ConfigValue) -> Option<Self>;
}

impl FromConfigValue for bool {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromConfigValue for i64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromConfigValue for u64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_int().and_then(|v| u64::try_from(v).ok())
    }
}

impl FromConfigValue for usize {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_int().and_then(|v| usize::try_from(v).ok())
    }
}

impl FromConfigValue for f64 {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromConfigValue for String {
    fn from_value(value: &ConfigValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// An immutable-after-construction key/value map attached to one node.
///
/// Reserved keys understood by the runtime itself:
/// - `syncInputs: bool` — run the worker's fusion loop (default `false`).
/// - `cloneMessage: bool` — deep-clone on broadcast (default `false`).
/// - `maxBatchSize: int` — batch pull size (default 4).
/// - `batchTimeoutMs: int` — batch pull window in ms (default 100).
/// - `fusionTimeoutMs: int` — fusion tuple eviction age in ms (default 60000).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy when assembling a config inline.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Typed lookup. Returns `default` when the key is absent or holds a
    /// value of a different type.
    pub fn get_or<T: FromConfigValue>(&self, key: &str, default: T) -> T {
        self.values
            .get(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.values.iter()
    }
}
