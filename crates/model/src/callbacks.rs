//! Callback registry and dispatcher
//!
//! Each proxy owns a private registry of observer callbacks keyed by
//! callback kind. Registration hands back an opaque handle; keyed
//! registration makes dedup explicit: re-registering the same key
//! replaces the prior entry in place. Dispatch snapshots the registered
//! tuples under the lock and invokes them outside it, so a callback may
//! safely re-enter the registry without deadlocking.
//!
//! Callbacks are observers, not gatekeepers: a failing callback is
//! reported to the invoker but never blocks or rolls back the mutation
//! that triggered it.

use crate::operation::OperationContext;
use confmodel_core::{Error, OpContext, Record, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// When a callback should be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// On read access
    Get,
    /// Before an add is applied
    PreAdd,
    /// After an add is applied
    PostAdd,
    /// Before an update is applied
    PreUpdate,
    /// After an update is applied
    PostUpdate,
    /// Before a remove is applied
    PreRemove,
    /// After a remove is applied
    PostRemove,
    /// After a keyed collection changed shape
    PostListchange,
}

impl CallbackKind {
    /// Diagnostic name of the callback kind
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Get => "get",
            CallbackKind::PreAdd => "pre-add",
            CallbackKind::PostAdd => "post-add",
            CallbackKind::PreUpdate => "pre-update",
            CallbackKind::PostUpdate => "post-update",
            CallbackKind::PreRemove => "pre-remove",
            CallbackKind::PostRemove => "post-remove",
            CallbackKind::PostListchange => "post-listchange",
        }
    }
}

impl std::fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Argument passed to a callback
///
/// Bound arguments captured at registration come first, followed by the
/// caller-supplied arguments of the invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackArg {
    /// Details of the triggering operation
    Operation(OperationContext),
    /// A record involved in the operation
    Record(Record),
    /// Free-form text
    Text(String),
}

/// Structured failure reported by a callback
///
/// The dispatcher only inspects this returned outcome; it never attempts
/// generic fault interception around callback execution.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    /// Failure description
    pub message: String,
}

impl CallbackError {
    /// Create a callback error from a message
    pub fn new(message: impl Into<String>) -> Self {
        CallbackError {
            message: message.into(),
        }
    }
}

/// Outcome of one callback execution
pub type CallbackResult = std::result::Result<Option<CallbackArg>, CallbackError>;

/// An observer function
pub type CallbackFn = Arc<dyn Fn(&OpContext, &[CallbackArg]) -> CallbackResult + Send + Sync>;

/// Opaque registration token
///
/// Returned by `register`, required by `unregister`. Monotonic per
/// registry; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u64);

/// A registered observer plus its bound arguments
struct CallbackEntry {
    handle: CallbackHandle,
    dedup_key: Option<String>,
    func: CallbackFn,
    bound: Vec<CallbackArg>,
}

/// Per-proxy table of observer callbacks keyed by kind
#[derive(Default)]
pub struct CallbackRegistry {
    entries: RwLock<HashMap<CallbackKind, Vec<CallbackEntry>>>,
    next_handle: AtomicU64,
}

impl CallbackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_handle(&self) -> CallbackHandle {
        CallbackHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a callback for a kind
    ///
    /// Every call stores a new entry; use [`register_keyed`] when
    /// idempotent re-registration is wanted.
    ///
    /// [`register_keyed`]: CallbackRegistry::register_keyed
    pub fn register(
        &self,
        kind: CallbackKind,
        func: CallbackFn,
        bound: Vec<CallbackArg>,
    ) -> CallbackHandle {
        let handle = self.allocate_handle();
        self.entries.write().entry(kind).or_default().push(CallbackEntry {
            handle,
            dedup_key: None,
            func,
            bound,
        });
        handle
    }

    /// Register a callback under a dedup key
    ///
    /// At most one entry exists per `(kind, key)`: re-registering the
    /// same key replaces the stored function and bound arguments in
    /// place, preserving the original handle and dispatch position.
    pub fn register_keyed(
        &self,
        kind: CallbackKind,
        key: &str,
        func: CallbackFn,
        bound: Vec<CallbackArg>,
    ) -> CallbackHandle {
        let mut entries = self.entries.write();
        let list = entries.entry(kind).or_default();
        if let Some(existing) = list
            .iter_mut()
            .find(|e| e.dedup_key.as_deref() == Some(key))
        {
            debug!(kind = %kind, key, "replacing registered callback");
            existing.func = func;
            existing.bound = bound;
            return existing.handle;
        }
        let handle = self.allocate_handle();
        list.push(CallbackEntry {
            handle,
            dedup_key: Some(key.to_string()),
            func,
            bound,
        });
        handle
    }

    /// Remove a registration
    ///
    /// An absent kind or handle is a logged no-op, not an error. Returns
    /// whether an entry was removed.
    pub fn unregister(&self, kind: CallbackKind, handle: CallbackHandle) -> bool {
        let mut entries = self.entries.write();
        let Some(list) = entries.get_mut(&kind) else {
            warn!(kind = %kind, "unregister: no callbacks for kind");
            return false;
        };
        let before = list.len();
        list.retain(|e| e.handle != handle);
        if list.len() == before {
            warn!(kind = %kind, ?handle, "unregister: handle not registered");
            return false;
        }
        true
    }

    /// Number of callbacks registered for a kind
    pub fn count(&self, kind: CallbackKind) -> usize {
        self.entries.read().get(&kind).map_or(0, Vec::len)
    }

    /// Invoke all callbacks registered for a kind, in registration order
    ///
    /// Each callback receives its bound arguments followed by
    /// `call_args`. A failing callback is converted to a
    /// [`Error::CallbackExecution`]; with `proceed_on_error=false` the
    /// first failure halts iteration, otherwise all callbacks run and
    /// the last outcome is returned.
    pub fn invoke(
        &self,
        ctx: &OpContext,
        kind: CallbackKind,
        proceed_on_error: bool,
        call_args: &[CallbackArg],
    ) -> Result<Option<CallbackArg>> {
        // Snapshot under the read lock, invoke outside it: the registry
        // stays re-entrant from inside a callback.
        let snapshot: Vec<(CallbackFn, Vec<CallbackArg>)> = {
            let entries = self.entries.read();
            match entries.get(&kind) {
                Some(list) => list
                    .iter()
                    .map(|e| (Arc::clone(&e.func), e.bound.clone()))
                    .collect(),
                None => return Ok(None),
            }
        };

        let mut last: Result<Option<CallbackArg>> = Ok(None);
        for (func, mut args) in snapshot {
            args.extend_from_slice(call_args);
            match func(ctx, &args) {
                Ok(result) => last = Ok(result),
                Err(err) => {
                    warn!(kind = %kind, error = %err, "callback failed");
                    last = Err(Error::CallbackExecution {
                        message: err.message,
                    });
                    if !proceed_on_error {
                        debug!(kind = %kind, "stopping callback invocation");
                        return last;
                    }
                }
            }
        }
        last
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let counts: HashMap<&'static str, usize> =
            entries.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("CallbackRegistry").field("entries", &counts).finish()
    }
}
