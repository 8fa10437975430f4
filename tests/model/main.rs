//! Model Integration Tests
//!
//! End-to-end coverage of the public surface: path addressing, tree
//! operations with depth control, transaction branches, proxies with
//! exclusive claims, and callback dispatch.

#[path = "../common/mod.rs"]
mod common;

mod callbacks;
mod paths;
mod proxies;
mod schema;
mod transactions;
