//! Core types for the configuration model
//!
//! This crate defines the foundational types used throughout the system:
//! - Record: an externally-typed JSON document
//! - JsonValue: newtype wrapper over `serde_json::Value`
//! - ChildDescriptor / SchemaRegistry: per-type child metadata, memoized
//! - OpContext: cancellation-bearing operation context
//! - path: absolute path normalization and splitting
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod json;
pub mod path;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use context::{CancelHandle, OpContext};
pub use error::{Error, Result};
pub use json::JsonValue;
pub use record::Record;
pub use schema::{
    ChildDescriptor, DescriptorSource, Multiplicity, SchemaRegistry, StaticDescriptorSource,
};
