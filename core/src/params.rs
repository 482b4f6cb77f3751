//! Filter and update parameters, and their wire encoding.
//!
//! # Design
//! The service reads parameters as flat `key=value` pairs and rejects
//! list-literal values, so a list is sent as one pair per element
//! (`status=CUR&status=PLN`), which the service treats as an "in" group.
//!
//! Encoding is deterministic: keys in ascending order (the map is a
//! `BTreeMap`), list elements sorted ascending. Encoding the same map twice
//! yields the same string.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ApiError;

/// A parameter value: a single string or an OR-group of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Convert a record field into a parameter value. Strings pass through,
    /// arrays become lists, everything else is sent as its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => ParamValue::Scalar(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(json_text).collect()),
            other => ParamValue::Scalar(other.to_string()),
        }
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Scalar(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        ParamValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(value: [&str; N]) -> Self {
        ParamValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Filter or update criteria keyed by field name. Keys are never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter. Rejects empty keys.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<Option<ParamValue>, ApiError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ApiError::validation("parameter keys must not be empty"));
        }
        Ok(self.entries.insert(key, value.into()))
    }

    /// Builder form of `insert`.
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<Self, ApiError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expanded `key=value` pairs: one pair per scalar, one per list element.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match value {
                ParamValue::Scalar(s) => out.push((key.clone(), s.clone())),
                ParamValue::List(items) => {
                    let mut sorted: Vec<&String> = items.iter().collect();
                    sorted.sort();
                    out.extend(sorted.into_iter().map(|item| (key.clone(), item.clone())));
                }
            }
        }
        out
    }

    /// Form-urlencoded representation of `pairs()`.
    pub fn encode(&self) -> String {
        encode_pairs(&self.pairs())
    }
}

pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
