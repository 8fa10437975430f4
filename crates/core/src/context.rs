//! Operation context with cancellation
//!
//! Every model operation accepts an `OpContext`. Deep traversals check it
//! between node expansions and abort early with a cancellation error
//! instead of completing, keeping long reads responsive to caller
//! shutdown or deadlines.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation-bearing context for a model operation
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancelled: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled
    pub fn background() -> Self {
        OpContext::default()
    }

    /// A context cancellable through the returned handle
    pub fn cancellable() -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = OpContext {
            cancelled: Some(Arc::clone(&flag)),
            deadline: None,
        };
        (ctx, CancelHandle { flag })
    }

    /// A copy of this context that also expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        OpContext {
            cancelled: self.cancelled.clone(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// True if the context has been cancelled or its deadline passed
    pub fn is_cancelled(&self) -> bool {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Fail with [`Error::Cancelled`] if the context is no longer live
    ///
    /// Traversals call this between node expansions.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Handle used to cancel an [`OpContext`]
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel all contexts cloned from the originating one
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}
