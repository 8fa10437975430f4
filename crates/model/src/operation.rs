//! Operation tracking types
//!
//! `ProxyOperation` is the single current-operation flag a proxy exposes
//! for diagnostics; `OperationContext` is the supporting tuple handed to
//! callbacks describing what an operation touched.

use confmodel_core::Record;

/// The operation a proxy is currently executing
///
/// Single-valued; reset to `None` on every call's exit path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyOperation {
    /// No operation in flight
    #[default]
    None,
    /// A get is in flight
    Get,
    /// A list is in flight
    List,
    /// An add is in flight
    Add,
    /// An update is in flight
    Update,
    /// A remove is in flight
    Remove,
    /// A child-proxy creation is in flight
    Create,
    /// A watch registration is in flight
    Watch,
}

impl ProxyOperation {
    /// Diagnostic name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyOperation::None => "PROXY_NONE",
            ProxyOperation::Get => "PROXY_GET",
            ProxyOperation::List => "PROXY_LIST",
            ProxyOperation::Add => "PROXY_ADD",
            ProxyOperation::Update => "PROXY_UPDATE",
            ProxyOperation::Remove => "PROXY_REMOVE",
            ProxyOperation::Create => "PROXY_CREATE",
            ProxyOperation::Watch => "PROXY_WATCH",
        }
    }
}

impl std::fmt::Display for ProxyOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Details of the information used during an operation
///
/// Passed to callbacks so an observer can tell what was touched without
/// reaching back into the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationContext {
    /// Effective absolute path of the operation
    pub path: String,
    /// Data involved, if any
    pub data: Option<Record>,
    /// Child field the operation addressed, if any
    pub field_name: String,
    /// Key of the child the operation addressed, if any
    pub child_key: String,
}

impl OperationContext {
    /// Create a new operation context
    pub fn new(
        path: impl Into<String>,
        data: Option<Record>,
        field_name: impl Into<String>,
        child_key: impl Into<String>,
    ) -> Self {
        OperationContext {
            path: path.into(),
            data,
            field_name: field_name.into(),
            child_key: child_key.into(),
        }
    }

    /// Apply new data to the context
    pub fn update(mut self, data: Record) -> Self {
        self.data = Some(data);
        self
    }
}
