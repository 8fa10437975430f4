//! Proxy: the client-facing cursor into the tree
//!
//! A proxy is bound to one absolute path. Every call validates and
//! normalizes its relative path before touching the tree, records the
//! in-flight operation for the call's duration (reset on all exit paths
//! by a scoped guard), then delegates to the root using the concatenated
//! absolute path. The proxy also owns the callback registry observers
//! register against.

use crate::callbacks::{
    CallbackArg, CallbackFn, CallbackHandle, CallbackKind, CallbackRegistry,
};
use crate::operation::ProxyOperation;
use crate::root::Root;
use crate::transaction::Transaction;
use confmodel_core::{path, OpContext, Record, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// A bound cursor into the tree at one absolute path
pub struct Proxy {
    root: Arc<Root>,
    full_path: String,
    exclusive: bool,
    claim: Option<u64>,
    operation: RwLock<ProxyOperation>,
    callbacks: CallbackRegistry,
}

/// Scoped reset of the proxy's current-operation flag
struct OperationGuard<'a> {
    proxy: &'a Proxy,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        *self.proxy.operation.write() = ProxyOperation::None;
    }
}

impl Proxy {
    /// Bind a proxy to a normalized absolute path
    ///
    /// `claim` is the exclusive-ownership token to release on drop, when
    /// the proxy was created exclusive.
    pub(crate) fn new(
        root: Arc<Root>,
        full_path: String,
        exclusive: bool,
        claim: Option<u64>,
    ) -> Self {
        Proxy {
            root,
            full_path: path::normalize(&full_path).to_string(),
            exclusive,
            claim,
            operation: RwLock::new(ProxyOperation::None),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// The proxy's absolute path (root as empty string)
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Whether this proxy declared single-writer intent
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// The operation currently in flight, for diagnostics
    pub fn operation(&self) -> ProxyOperation {
        *self.operation.read()
    }

    fn track_operation(&self, operation: ProxyOperation) -> OperationGuard<'_> {
        *self.operation.write() = operation;
        OperationGuard { proxy: self }
    }

    /// Retrieve the value at `rel_path`, relative to this proxy
    pub fn get(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        depth: i64,
        deep: bool,
        txid: &str,
    ) -> Result<Record> {
        path::validate(rel_path)?;
        let effective = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Get);
        debug!(path = rel_path, effective = %effective, operation = %self.operation(), "proxy-get");
        self.root.get(ctx, &effective, depth, deep, txid)
    }

    /// Retrieve the keyed collection at `rel_path`, relative to this proxy
    pub fn list(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        depth: i64,
        deep: bool,
        txid: &str,
    ) -> Result<Vec<Record>> {
        path::validate(rel_path)?;
        let effective = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::List);
        debug!(path = rel_path, effective = %effective, operation = %self.operation(), "proxy-list");
        self.root.list(ctx, &effective, depth, deep, txid)
    }

    /// Modify the record at `rel_path` with the provided data
    pub fn update(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        data: Record,
        strict: bool,
        txid: &str,
    ) -> Result<Record> {
        path::validate(rel_path)?;
        let full = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Update);
        debug!(path = rel_path, full = %full, operation = %self.operation(), "proxy-update");
        self.root.update(ctx, &full, data, strict, txid)
    }

    /// Insert new data into the keyed collection at `rel_path`
    pub fn add(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        data: Record,
        txid: &str,
    ) -> Result<Record> {
        path::validate(rel_path)?;
        let full = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Add);
        debug!(path = rel_path, full = %full, operation = %self.operation(), "proxy-add");
        self.root.add(ctx, &full, data, txid)
    }

    /// Insert new data, declaring the id the caller expects it to get
    ///
    /// The id participates in the effective address used for
    /// diagnostics; the storage key still comes from the data itself.
    pub fn add_with_id(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        id: &str,
        data: Record,
        txid: &str,
    ) -> Result<Record> {
        path::validate(rel_path)?;
        let full = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Add);
        debug!(path = rel_path, full = %full, id, operation = %self.operation(), "proxy-add-with-id");
        self.root.add_with_id(ctx, &full, id, data, txid)
    }

    /// Delete the subtree at `rel_path`
    pub fn remove(&self, ctx: &OpContext, rel_path: &str, txid: &str) -> Result<Record> {
        path::validate(rel_path)?;
        let full = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Remove);
        debug!(path = rel_path, full = %full, operation = %self.operation(), "proxy-remove");
        self.root.remove(ctx, &full, txid)
    }

    /// Create a child proxy bound to a path-extended location
    pub fn create_proxy(&self, rel_path: &str, exclusive: bool) -> Result<Arc<Proxy>> {
        path::validate(rel_path)?;
        let full = path::join(&self.full_path, rel_path);
        let _op = self.track_operation(ProxyOperation::Create);
        debug!(path = rel_path, full = %full, operation = %self.operation(), "proxy-create");
        let target = if full.is_empty() { "/" } else { full.as_str() };
        self.root.create_proxy(target, exclusive)
    }

    /// Open a transaction branch bound to this proxy
    ///
    /// The proxy keeps no notion of being "in" the transaction; every
    /// subsequent call carries the txid explicitly.
    pub fn open_transaction(self: &Arc<Self>) -> Transaction {
        let txid = self.root.make_tx_branch();
        Transaction::new(Arc::clone(self), txid)
    }

    pub(crate) fn commit_transaction(&self, ctx: &OpContext, txid: &str) -> Result<()> {
        self.root.fold_tx_branch(ctx, txid)
    }

    pub(crate) fn cancel_transaction(&self, txid: &str) -> Result<()> {
        self.root.delete_tx_branch(txid)
    }

    /// Register an observer callback
    pub fn register_callback(
        &self,
        kind: CallbackKind,
        func: CallbackFn,
        bound: Vec<CallbackArg>,
    ) -> CallbackHandle {
        self.callbacks.register(kind, func, bound)
    }

    /// Register an observer callback under a dedup key
    pub fn register_callback_keyed(
        &self,
        kind: CallbackKind,
        key: &str,
        func: CallbackFn,
        bound: Vec<CallbackArg>,
    ) -> CallbackHandle {
        self.callbacks.register_keyed(kind, key, func, bound)
    }

    /// Remove an observer registration (absent handle is a logged no-op)
    pub fn unregister_callback(&self, kind: CallbackKind, handle: CallbackHandle) -> bool {
        self.callbacks.unregister(kind, handle)
    }

    /// Execute all callbacks associated with a kind
    pub fn invoke_callbacks(
        &self,
        ctx: &OpContext,
        kind: CallbackKind,
        proceed_on_error: bool,
        call_args: &[CallbackArg],
    ) -> Result<Option<CallbackArg>> {
        self.callbacks.invoke(ctx, kind, proceed_on_error, call_args)
    }

    /// Number of callbacks registered for a kind
    pub fn callback_count(&self, kind: CallbackKind) -> usize {
        self.callbacks.count(kind)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if let Some(id) = self.claim {
            self.root.release_claim(id);
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("full_path", &self.full_path)
            .field("exclusive", &self.exclusive)
            .field("operation", &self.operation())
            .finish()
    }
}
