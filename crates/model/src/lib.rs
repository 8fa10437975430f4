//! Hierarchical configuration model
//!
//! The model layer owns the tree: a root that holds the main view and
//! the registry of transaction branches, nodes that expand records into
//! typed children, proxies bound to absolute paths, transaction handles
//! over isolated branches, and the callback registry proxies dispatch
//! through.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod branch;
mod callbacks;
mod node;
mod operation;
mod proxy;
mod root;
mod transaction;

pub use branch::BranchState;
pub use callbacks::{
    CallbackArg, CallbackError, CallbackFn, CallbackHandle, CallbackKind,
    CallbackRegistry, CallbackResult,
};
pub use node::{Node, DEPTH_UNBOUNDED};
pub use operation::{OperationContext, ProxyOperation};
pub use proxy::Proxy;
pub use root::Root;
pub use transaction::Transaction;
