//! Typed records
//!
//! A record is an externally-typed value: a JSON document tagged with the
//! name of its schema type. The type name is what the schema registry keys
//! descriptor lookups on; the document itself carries the identifying key
//! for keyed children (identity is never assigned by the store).

use crate::error::{Error, Result};
use crate::json::JsonValue;
use serde::{Deserialize, Serialize};

/// An externally-typed value stored in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Schema type name, used for child-descriptor lookups
    pub type_name: String,
    /// The record's data
    pub value: JsonValue,
}

impl Record {
    /// Create a new record
    pub fn new(type_name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Record {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// Extract the record's identifying key from a designated field
    ///
    /// String and integer key fields are accepted; anything else (or an
    /// absent field) violates the descriptor contract.
    pub fn key_from_field(&self, key_field: &str) -> Result<String> {
        match self.value.field(key_field) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(Error::schema(format!(
                "key field {} of {} is not a scalar: {}",
                key_field, self.type_name, other
            ))),
            None => Err(Error::schema(format!(
                "record of type {} has no key field {}",
                self.type_name, key_field
            ))),
        }
    }
}
