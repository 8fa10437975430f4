//! Tree store root
//!
//! The root owns the main tree, the registry of open transaction
//! branches, and the exclusive-proxy ownership table. It is the sole
//! mutator of the tree's structural pointers: structural writes are
//! serialized per branch by one write lock per tree, so concurrent
//! readers never observe a torn tree, and a fold is a single swap of the
//! main tree root, atomic from any reader's perspective.

use crate::branch::{BranchState, TxBranch};
use crate::node::Node;
use crate::proxy::Proxy;
use confmodel_core::{path, Error, OpContext, Record, Result, SchemaRegistry};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// An exclusive-proxy claim over a path prefix
#[derive(Debug)]
struct ExclusiveClaim {
    id: u64,
    segments: Vec<String>,
}

/// Owner of the main tree and the transaction-branch registry
pub struct Root {
    registry: Arc<SchemaRegistry>,
    tree: RwLock<Node>,
    branches: DashMap<String, TxBranch>,
    claims: Mutex<Vec<ExclusiveClaim>>,
    next_claim: AtomicU64,
}

impl Root {
    /// Create a root whose top node is an empty record of `root_type`
    pub fn new(registry: Arc<SchemaRegistry>, root_type: &str) -> Result<Arc<Root>> {
        let tree = Node::empty(&registry, root_type)?;
        Ok(Arc::new(Root {
            registry,
            tree: RwLock::new(tree),
            branches: DashMap::new(),
            claims: Mutex::new(Vec::new()),
            next_claim: AtomicU64::new(1),
        }))
    }

    /// Schema registry this root resolves child descriptors against
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    fn display_path(path: &str) -> &str {
        if path.is_empty() {
            "/"
        } else {
            path
        }
    }

    fn read_tree<R>(&self, txid: &str, f: impl FnOnce(&Node) -> Result<R>) -> Result<R> {
        if txid.is_empty() {
            return f(&self.tree.read());
        }
        let branch = self.branches.get(txid).ok_or_else(|| Error::TransactionState {
            txid: txid.to_string(),
            state: "unknown".to_string(),
        })?;
        match (&branch.tree, branch.state) {
            (Some(tree), BranchState::Open) => f(&tree.read()),
            _ => Err(Error::TransactionState {
                txid: txid.to_string(),
                state: branch.state.as_str().to_string(),
            }),
        }
    }

    fn write_tree<R>(&self, txid: &str, f: impl FnOnce(&mut Node) -> Result<R>) -> Result<R> {
        if txid.is_empty() {
            return f(&mut self.tree.write());
        }
        let branch = self.branches.get(txid).ok_or_else(|| Error::TransactionState {
            txid: txid.to_string(),
            state: "unknown".to_string(),
        })?;
        match (&branch.tree, branch.state) {
            (Some(tree), BranchState::Open) => f(&mut tree.write()),
            _ => Err(Error::TransactionState {
                txid: txid.to_string(),
                state: branch.state.as_str().to_string(),
            }),
        }
    }

    /// Retrieve the value at `path`
    ///
    /// `depth` bounds child expansion (0 = leaf value only); `deep` or a
    /// negative depth expands without bound. Returns a value, not a
    /// reference: callers cannot mutate the tree through the result.
    pub fn get(
        &self,
        ctx: &OpContext,
        path_arg: &str,
        depth: i64,
        deep: bool,
        txid: &str,
    ) -> Result<Record> {
        ctx.check()?;
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments = path::segments(norm);
        self.read_tree(txid, |tree| {
            tree.get(
                &self.registry,
                ctx,
                &segments,
                Self::display_path(norm),
                depth,
                deep,
            )
        })
    }

    /// Retrieve the members of the keyed collection at `path`, in key order
    pub fn list(
        &self,
        ctx: &OpContext,
        path_arg: &str,
        depth: i64,
        deep: bool,
        txid: &str,
    ) -> Result<Vec<Record>> {
        ctx.check()?;
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments = path::segments(norm);
        self.read_tree(txid, |tree| {
            tree.list(
                &self.registry,
                ctx,
                &segments,
                Self::display_path(norm),
                depth,
                deep,
            )
        })
    }

    /// Replace or merge the record at `path` and return the stored value
    pub fn update(
        &self,
        ctx: &OpContext,
        path_arg: &str,
        data: Record,
        strict: bool,
        txid: &str,
    ) -> Result<Record> {
        ctx.check()?;
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments = path::segments(norm);
        debug!(path = %Self::display_path(norm), strict, txid, "update");
        self.write_tree(txid, |tree| {
            tree.update(
                &self.registry,
                ctx,
                &segments,
                data,
                strict,
                Self::display_path(norm),
            )
        })
    }

    /// Insert `data` into the keyed collection at `path`
    ///
    /// The storage key is derived from the data's own identifying field.
    pub fn add(
        &self,
        ctx: &OpContext,
        path_arg: &str,
        data: Record,
        txid: &str,
    ) -> Result<Record> {
        ctx.check()?;
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments = path::segments(norm);
        debug!(path = %Self::display_path(norm), txid, "add");
        self.write_tree(txid, |tree| {
            tree.add(
                &self.registry,
                ctx,
                &segments,
                data,
                Self::display_path(norm),
            )
        })
    }

    /// Insert `data` at `path`, logging the caller's expected id
    ///
    /// The `id` affects only the effective address reported for
    /// diagnostics; the authoritative storage key still comes from the
    /// data's own identifying field.
    pub fn add_with_id(
        &self,
        ctx: &OpContext,
        path_arg: &str,
        id: &str,
        data: Record,
        txid: &str,
    ) -> Result<Record> {
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        debug!(effective = %format!("{}/{}", norm, id), txid, "add-with-id");
        self.add(ctx, path_arg, data, txid)
    }

    /// Delete the subtree rooted at `path` and return the removed value
    pub fn remove(&self, ctx: &OpContext, path_arg: &str, txid: &str) -> Result<Record> {
        ctx.check()?;
        path::validate_normalized(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments = path::segments(norm);
        debug!(path = %Self::display_path(norm), txid, "remove");
        self.write_tree(txid, |tree| {
            tree.remove(&self.registry, ctx, &segments, Self::display_path(norm))
        })
    }

    /// Create a proxy bound to `path`
    ///
    /// `exclusive=true` declares single-writer intent for the subtree: a
    /// second exclusive proxy over an overlapping prefix is rejected. The
    /// claim is released when the proxy is dropped.
    pub fn create_proxy(
        self: &Arc<Self>,
        path_arg: &str,
        exclusive: bool,
    ) -> Result<Arc<Proxy>> {
        path::validate(path_arg)?;
        let norm = path::normalize(path_arg);
        let segments: Vec<String> = path::segments(norm)
            .into_iter()
            .map(str::to_string)
            .collect();

        {
            let tree = self.tree.read();
            let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
            if !tree.contains(&self.registry, &segs) {
                return Err(Error::not_found(Self::display_path(norm)));
            }
        }

        let claim = if exclusive {
            Some(self.claim_exclusive(norm, segments)?)
        } else {
            None
        };

        debug!(path = %Self::display_path(norm), exclusive, "create-proxy");
        Ok(Arc::new(Proxy::new(
            Arc::clone(self),
            norm.to_string(),
            exclusive,
            claim,
        )))
    }

    fn claim_exclusive(&self, display: &str, segments: Vec<String>) -> Result<u64> {
        let mut claims = self.claims.lock();
        let overlaps = claims.iter().any(|c| {
            let shorter = c.segments.len().min(segments.len());
            c.segments[..shorter] == segments[..shorter]
        });
        if overlaps {
            return Err(Error::ExclusiveConflict {
                path: Self::display_path(display).to_string(),
            });
        }
        let id = self.next_claim.fetch_add(1, Ordering::Relaxed);
        claims.push(ExclusiveClaim { id, segments });
        Ok(id)
    }

    /// Release an exclusive claim; called when a proxy drops
    pub(crate) fn release_claim(&self, id: u64) {
        self.claims.lock().retain(|c| c.id != id);
    }

    /// Open a new transaction branch and return its id
    ///
    /// The branch is an isolated deep copy of the main tree at this
    /// moment; staged mutations stay invisible to main-tree reads until
    /// the branch is folded.
    pub fn make_tx_branch(&self) -> String {
        let txid = Uuid::new_v4().to_string();
        let copy = self.tree.read().clone();
        self.branches.insert(txid.clone(), TxBranch::open(copy));
        debug!(txid = %txid, "make-tx-branch");
        txid
    }

    /// Fold a branch's staged changes into the main tree
    ///
    /// The merge is last-writer-wins at the tree level: the staged tree
    /// replaces the main tree in one swap, so readers never observe a
    /// partially merged branch. The branch becomes a committed tombstone.
    pub fn fold_tx_branch(&self, ctx: &OpContext, txid: &str) -> Result<()> {
        ctx.check()?;
        let staged = {
            let mut branch = self.branches.get_mut(txid).ok_or_else(|| {
                Error::TransactionState {
                    txid: txid.to_string(),
                    state: "unknown".to_string(),
                }
            })?;
            if branch.state.is_terminal() {
                return Err(Error::TransactionState {
                    txid: txid.to_string(),
                    state: branch.state.as_str().to_string(),
                });
            }
            branch.close(BranchState::Committed)
        };
        if let Some(staged) = staged {
            *self.tree.write() = staged;
        }
        info!(txid = %txid, "fold-tx-branch");
        Ok(())
    }

    /// Discard a branch and everything staged in it
    pub fn delete_tx_branch(&self, txid: &str) -> Result<()> {
        let mut branch = self.branches.get_mut(txid).ok_or_else(|| {
            Error::TransactionState {
                txid: txid.to_string(),
                state: "unknown".to_string(),
            }
        })?;
        if branch.state.is_terminal() {
            return Err(Error::TransactionState {
                txid: txid.to_string(),
                state: branch.state.as_str().to_string(),
            });
        }
        branch.close(BranchState::Cancelled);
        info!(txid = %txid, "delete-tx-branch");
        Ok(())
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("branches", &self.branches.len())
            .field("claims", &self.claims.lock().len())
            .finish()
    }
}
