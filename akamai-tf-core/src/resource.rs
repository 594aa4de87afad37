//! Resource - Identifiers, composite import IDs and typed option values

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Unique identifier for a resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "akamai_property_activation")
    pub resource_type: String,
    /// Composite ID as persisted in state (e.g., "prp_1:STAGING")
    pub id: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportIdError {
    #[error("invalid import ID '{id}': expected format {expected}")]
    Malformed { id: String, expected: String },

    #[error("invalid import ID '{id}': part {position} is empty")]
    EmptyPart { id: String, position: usize },
}

/// Join the parts of a composite ID
pub fn join_id(parts: &[&str], separator: char) -> String {
    parts.join(&separator.to_string())
}

/// Split a composite ID into exactly `expected` non-empty parts
///
/// `shape` is shown to the user when the ID is malformed
/// (e.g., "propertyID:network").
pub fn split_id(
    id: &str,
    separator: char,
    expected: usize,
    shape: &str,
) -> Result<Vec<String>, ImportIdError> {
    let parts: Vec<String> = id.split(separator).map(|p| p.trim().to_string()).collect();
    if parts.len() != expected {
        return Err(ImportIdError::Malformed {
            id: id.to_string(),
            expected: shape.to_string(),
        });
    }
    if let Some(position) = parts.iter().position(|p| p.is_empty()) {
        return Err(ImportIdError::EmptyPart {
            id: id.to_string(),
            position: position + 1,
        });
    }
    Ok(parts)
}

/// Deserialize `null` as the type's default, so that a missing collection,
/// an explicit `null` and an empty collection all read the same
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Longest timeout accepted for a single operation, in minutes (one week)
pub const MAX_TIMEOUT_MINUTES: u64 = 7 * 24 * 60;

/// Per-operation timeouts configured on a resource, in minutes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<u64>,
}

impl Timeouts {
    pub fn create_or(&self, default: Duration) -> Duration {
        Self::pick(self.create, default)
    }

    pub fn update_or(&self, default: Duration) -> Duration {
        Self::pick(self.update, default)
    }

    pub fn delete_or(&self, default: Duration) -> Duration {
        Self::pick(self.delete, default)
    }

    /// Record an error for every timeout outside `1..=MAX_TIMEOUT_MINUTES`
    pub fn validate(&self, errors: &mut Vec<ValidationError>) {
        let fields = [
            ("timeouts.create", self.create),
            ("timeouts.update", self.update),
            ("timeouts.delete", self.delete),
        ];
        for (name, minutes) in fields {
            if let Some(m) = minutes.filter(|m| !(1..=MAX_TIMEOUT_MINUTES).contains(m)) {
                errors.push(ValidationError::invalid(
                    name,
                    m.to_string(),
                    format!("must be between 1 and {} minutes", MAX_TIMEOUT_MINUTES),
                ));
            }
        }
    }

    fn pick(minutes: Option<u64>, default: Duration) -> Duration {
        minutes
            .map(|m| Duration::from_secs(m.saturating_mul(60)))
            .unwrap_or(default)
    }
}

/// Loosely typed option value (rule behavior/criteria options, for example)
///
/// Maps are ordered by key so that equality does not depend on the order in
/// which the server emitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(i.into())
    }
}
