//! confmodel - Path-addressed hierarchical configuration store
//!
//! confmodel keeps a tree of typed records addressable by slash-separated
//! paths, with isolated transaction branches, exclusive proxies, and
//! observer callbacks dispatched around mutations.
//!
//! # Quick Start
//!
//! ```
//! use confmodel::{
//!     ChildDescriptor, OpContext, Record, Root, SchemaRegistry,
//!     StaticDescriptorSource,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> confmodel::Result<()> {
//! let registry = Arc::new(SchemaRegistry::new(
//!     StaticDescriptorSource::new()
//!         .with_type("Root", vec![ChildDescriptor::many("devices", "Device", "id")]),
//! ));
//! let root = Root::new(registry, "Root")?;
//! let ctx = OpContext::background();
//!
//! root.add(&ctx, "/devices", Record::new("Device", json!({"id": "dev1"})), "")?;
//! let dev = root.get(&ctx, "/devices/dev1", 0, false, "")?;
//! assert_eq!(dev.value.field("id"), Some(&json!("dev1")));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The tree and its addressing primitives live in `confmodel-core`; the
//! [`Root`], [`Proxy`], and [`Transaction`] machinery lives in
//! `confmodel-model`. This crate re-exports both as one surface.

pub use confmodel_core::*;
pub use confmodel_model::*;
