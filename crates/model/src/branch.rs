//! Transaction branches
//!
//! A branch is an isolated deep copy of the tree taken when a transaction
//! opens. Mutations staged under its txid are invisible to main-tree
//! reads until the branch is folded, and are discarded permanently when
//! it is deleted. Terminal branches stay registered as tombstones so that
//! reuse of a txid fails instead of silently operating on stale state.

use crate::node::Node;
use parking_lot::RwLock;

/// Lifecycle state of a transaction branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// Usable: reads and staged mutations accepted
    Open,
    /// Folded into the main tree (terminal)
    Committed,
    /// Discarded without folding (terminal)
    Cancelled,
}

impl BranchState {
    /// Lowercase name used in transaction-state errors
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchState::Open => "open",
            BranchState::Committed => "committed",
            BranchState::Cancelled => "cancelled",
        }
    }

    /// True for the two terminal states
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BranchState::Open)
    }
}

impl std::fmt::Display for BranchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One registered transaction branch
///
/// The tree is dropped when the branch reaches a terminal state; the
/// entry itself remains as a tombstone carrying the final state.
#[derive(Debug)]
pub(crate) struct TxBranch {
    /// Isolated copy of the tree; `None` once terminal
    pub tree: Option<RwLock<Node>>,
    /// Current lifecycle state
    pub state: BranchState,
}

impl TxBranch {
    /// Open a branch over a copied tree
    pub fn open(tree: Node) -> Self {
        TxBranch {
            tree: Some(RwLock::new(tree)),
            state: BranchState::Open,
        }
    }

    /// Transition to a terminal state, returning the staged tree
    pub fn close(&mut self, state: BranchState) -> Option<Node> {
        self.state = state;
        self.tree.take().map(|t| t.into_inner())
    }
}
