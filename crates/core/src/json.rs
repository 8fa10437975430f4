//! JSON value wrapper for record payloads
//!
//! Records in the model carry their data as JSON documents. This module
//! defines `JsonValue`, a newtype around `serde_json::Value` providing:
//! - Direct access to the underlying value via Deref/DerefMut
//! - Object field helpers used by the tree store (take/set/merge)
//! - Serialization/deserialization support

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// JSON value wrapper
///
/// Newtype around `serde_json::Value`. The tree store splits declared
/// child-collection fields out of a record's `JsonValue` into child nodes
/// and re-assembles them on read, so most accesses here are object-field
/// operations.
///
/// # Examples
///
/// ```
/// use confmodel_core::JsonValue;
///
/// let mut v = JsonValue::from_value(serde_json::json!({"id": "dev1"}));
/// assert!(v.is_object());
/// assert_eq!(v.field("id").and_then(|f| f.as_str()), Some("dev1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct JsonValue(serde_json::Value);

impl JsonValue {
    /// Create a null JSON value
    pub fn null() -> Self {
        JsonValue(serde_json::Value::Null)
    }

    /// Create an empty JSON object
    pub fn object() -> Self {
        JsonValue(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Create from a serde_json::Value
    pub fn from_value(value: serde_json::Value) -> Self {
        JsonValue(value)
    }

    /// Get the underlying serde_json::Value
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }

    /// Get a reference to the underlying serde_json::Value
    pub fn as_inner(&self) -> &serde_json::Value {
        &self.0
    }

    /// Get an object field by name
    ///
    /// Returns None when the value is not an object or the field is absent.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.as_object().and_then(|m| m.get(name))
    }

    /// Remove and return an object field by name
    pub fn take_field(&mut self, name: &str) -> Option<serde_json::Value> {
        self.0.as_object_mut().and_then(|m| m.remove(name))
    }

    /// Insert or replace an object field
    ///
    /// A null or missing value is promoted to an empty object first, so
    /// re-assembly of child collections never fails on a leaf payload.
    pub fn set_field(&mut self, name: &str, value: serde_json::Value) {
        if !self.0.is_object() {
            self.0 = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(m) = self.0.as_object_mut() {
            m.insert(name.to_string(), value);
        }
    }

    /// Shallow field-level merge of another object into this one
    ///
    /// Fields present in `other` overwrite same-named fields here; fields
    /// absent from `other` are left untouched. Non-object operands fall
    /// back to whole-value replacement.
    pub fn merge_fields(&mut self, other: &JsonValue) {
        match (self.0.as_object_mut(), other.0.as_object()) {
            (Some(mine), Some(theirs)) => {
                for (k, v) in theirs {
                    mine.insert(k.clone(), v.clone());
                }
            }
            _ => self.0 = other.0.clone(),
        }
    }

    /// Serialize to compact JSON string
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

impl Deref for JsonValue {
    type Target = serde_json::Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for JsonValue {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        JsonValue(value)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
