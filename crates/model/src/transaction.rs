//! Transaction handles
//!
//! A transaction wraps a proxy plus the txid of a registered branch.
//! Every data operation routed through the handle carries the txid, so
//! reads see staged state and writes land in the branch. `commit` folds
//! the branch into the main tree atomically; `cancel` discards it. Both
//! are terminal: any further use of the handle is rejected with the
//! state the transaction ended in.

use crate::branch::BranchState;
use crate::proxy::Proxy;
use confmodel_core::{Error, OpContext, Record, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// A handle over one isolated transaction branch
pub struct Transaction {
    proxy: Arc<Proxy>,
    txid: String,
    status: Mutex<BranchState>,
}

impl Transaction {
    pub(crate) fn new(proxy: Arc<Proxy>, txid: String) -> Self {
        debug!(txid = %txid, "transaction-open");
        Transaction {
            proxy,
            txid,
            status: Mutex::new(BranchState::Open),
        }
    }

    /// The branch identifier this handle routes through
    pub fn txid(&self) -> &str {
        &self.txid
    }

    fn check_open(&self) -> Result<()> {
        let status = self.status.lock();
        if status.is_terminal() {
            return Err(Error::TransactionState {
                txid: self.txid.clone(),
                state: status.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Read from the branch
    pub fn get(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        depth: i64,
        deep: bool,
    ) -> Result<Record> {
        self.check_open()?;
        self.proxy.get(ctx, rel_path, depth, deep, &self.txid)
    }

    /// List a keyed collection in the branch
    pub fn list(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        depth: i64,
        deep: bool,
    ) -> Result<Vec<Record>> {
        self.check_open()?;
        self.proxy.list(ctx, rel_path, depth, deep, &self.txid)
    }

    /// Stage an update in the branch
    pub fn update(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        data: Record,
        strict: bool,
    ) -> Result<Record> {
        self.check_open()?;
        self.proxy.update(ctx, rel_path, data, strict, &self.txid)
    }

    /// Stage an insert in the branch
    pub fn add(&self, ctx: &OpContext, rel_path: &str, data: Record) -> Result<Record> {
        self.check_open()?;
        self.proxy.add(ctx, rel_path, data, &self.txid)
    }

    /// Stage an insert with a caller-declared id
    pub fn add_with_id(
        &self,
        ctx: &OpContext,
        rel_path: &str,
        id: &str,
        data: Record,
    ) -> Result<Record> {
        self.check_open()?;
        self.proxy.add_with_id(ctx, rel_path, id, data, &self.txid)
    }

    /// Stage a removal in the branch
    pub fn remove(&self, ctx: &OpContext, rel_path: &str) -> Result<Record> {
        self.check_open()?;
        self.proxy.remove(ctx, rel_path, &self.txid)
    }

    /// Fold the branch into the main tree
    pub fn commit(&self, ctx: &OpContext) -> Result<()> {
        let mut status = self.status.lock();
        if status.is_terminal() {
            return Err(Error::TransactionState {
                txid: self.txid.clone(),
                state: status.as_str().to_string(),
            });
        }
        self.proxy.commit_transaction(ctx, &self.txid)?;
        *status = BranchState::Committed;
        debug!(txid = %self.txid, "transaction-committed");
        Ok(())
    }

    /// Discard the branch and everything staged in it
    pub fn cancel(&self) -> Result<()> {
        let mut status = self.status.lock();
        if status.is_terminal() {
            return Err(Error::TransactionState {
                txid: self.txid.clone(),
                state: status.as_str().to_string(),
            });
        }
        self.proxy.cancel_transaction(&self.txid)?;
        *status = BranchState::Cancelled;
        debug!(txid = %self.txid, "transaction-cancelled");
        Ok(())
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("txid", &self.txid)
            .field("status", &*self.status.lock())
            .finish()
    }
}
