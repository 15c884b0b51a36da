//! Named numeric parameters carried by one candidate.
//!
//! A `ParameterSet` is built once (through [`ParameterSetBuilder`]) and its key set is
//! fixed from then on: values can be overwritten, keys can't be added or removed. This
//! keeps every individual of a run on the same schema.

use crate::domain::errors::OptimizationError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, ParamValue::Int(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
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

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

/// Ordered mapping from parameter name to value with a fixed key set.
///
/// Two sets are equal when they hold the same keys and every value renders to the same
/// text, so `Int(2)` and `Float(2.0)` compare equal. `Hash` follows the same rule and is
/// independent of key order.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterSet {
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    /// Builds a set from `(name, value)` pairs, rejecting duplicate names.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, OptimizationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        entries
            .into_iter()
            .fold(Self::builder(), |builder, (name, value)| {
                builder.with(name, value)
            })
            .build()
    }

    pub fn get(&self, name: &str) -> Result<ParamValue, OptimizationError> {
        self.position(name)
            .map(|idx| self.entries[idx].1)
            .ok_or_else(|| OptimizationError::key_not_found(name))
    }

    /// Overwrites the value of an existing key. Unknown keys are rejected.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), OptimizationError> {
        let idx = self
            .position(name)
            .ok_or_else(|| OptimizationError::key_not_found(name))?;
        self.entries[idx].1 = value.into();
        Ok(())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Key at `index` in insertion order.
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(key, value)| {
                other
                    .get(key)
                    .map(|theirs| theirs.to_string() == value.to_string())
                    .unwrap_or(false)
            })
    }
}

impl Eq for ParameterSet {}

impl Hash for ParameterSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut rendered: Vec<(&str, String)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect();
        rendered.sort();
        rendered.hash(state);
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Collects entries for a new [`ParameterSet`]. The only place keys can be added.
#[derive(Debug, Default)]
pub struct ParameterSetBuilder {
    entries: Vec<(String, ParamValue)>,
    duplicate: Option<String>,
}

impl ParameterSetBuilder {
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let name = name.into();
        if self.entries.iter().any(|(k, _)| *k == name) {
            self.duplicate.get_or_insert(name);
        } else {
            self.entries.push((name, value.into()));
        }
        self
    }

    pub fn build(self) -> Result<ParameterSet, OptimizationError> {
        if let Some(name) = self.duplicate {
            return Err(OptimizationError::invalid_argument(format!(
                "duplicate parameter name '{}'",
                name
            )));
        }
        Ok(ParameterSet {
            entries: self.entries,
        })
    }
}
