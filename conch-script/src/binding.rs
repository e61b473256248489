//! Engine-neutral values for script globals.

use std::collections::BTreeMap;

/// A value a host can place into (or read back from) an interpreter's
/// global scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Table(BTreeMap<String, Binding>),
}

impl Binding {
    /// Builds a table from `(key, value)` pairs.
    pub fn table<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Binding)>,
    {
        Binding::Table(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Field lookup on a table binding.
    pub fn get(&self, key: &str) -> Option<&Binding> {
        match self {
            Binding::Table(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Binding::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Binding::Int(i) => Some(*i),
            Binding::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Binding::Nil)
    }
}

impl From<bool> for Binding {
    fn from(value: bool) -> Self {
        Binding::Bool(value)
    }
}

impl From<i64> for Binding {
    fn from(value: i64) -> Self {
        Binding::Int(value)
    }
}

impl From<usize> for Binding {
    fn from(value: usize) -> Self {
        Binding::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Binding::Float(value)
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Binding::Str(value.to_string())
    }
}

impl From<String> for Binding {
    fn from(value: String) -> Self {
        Binding::Str(value)
    }
}

impl<T: Into<Binding>> From<Option<T>> for Binding {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Binding::Nil)
    }
}
