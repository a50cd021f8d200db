//! Shared access to a round from the message path and the timer path.
//!
//! Every operation holds the lock for exactly one call into the
//! [`RoundContext`]; queries share the lock, mutations take it exclusively.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::context::RoundContext;

/// Cloneable handle to a round context.
#[derive(Debug, Clone, Default)]
pub struct RoundHandle {
    inner: Arc<RwLock<RoundContext>>,
}

impl RoundHandle {
    pub fn new(context: RoundContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Run a read-only query under the shared lock.
    pub async fn read<R>(&self, f: impl FnOnce(&RoundContext) -> R) -> R {
        let guard = self.inner.read().await;
        f(&guard)
    }

    /// Run a mutation under the exclusive lock.
    pub async fn write<R>(&self, f: impl FnOnce(&mut RoundContext) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }

    /// Snapshot of the context, detached from the handle.
    pub async fn snapshot(&self) -> RoundContext {
        self.inner.read().await.clone()
    }
}
