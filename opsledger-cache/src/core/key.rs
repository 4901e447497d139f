//! Cache key construction
//!
//! Keys are built from a cache type tag plus an optional parameter map, so
//! that every handler producing the same logical artifact lands on the same
//! key no matter how it assembled its parameters.

use std::collections::BTreeMap;
use std::fmt;

/// A scalar parameter value for key construction
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Parameter map for cache key construction
///
/// Backed by a `BTreeMap`, so iteration is always sorted by parameter name
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyParams(BTreeMap<String, ParamValue>);

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter (builder style)
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

/// Build a cache key from a type tag and parameters.
///
/// With no parameters the key is the type tag itself; otherwise parameters
/// are rendered as `name=value` pairs, sorted ascending by name and joined
/// with `&`: `type:k1=v1&k2=v2`.
///
/// Values are not escaped, so `&` or `=` inside a value can collide with the
/// separator. Callers own their parameter vocabulary and must keep values
/// separator-free.
pub fn build_key(cache_type: &str, params: &KeyParams) -> String {
    if params.is_empty() {
        return cache_type.to_string();
    }

    let joined = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}:{}", cache_type, joined)
}
