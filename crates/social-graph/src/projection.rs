//! Staleness flag plus a read-write lock serializing projection rebuilds against rankings.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard};

/// Rankings hold a read guard for the whole query; rebuilds (drop + create) take the write guard.
/// A rebuild never runs while a ranking reads the projection, and concurrent callers that all
/// observe a stale projection rebuild it once.
pub struct ProjectionGuard {
    stale: AtomicBool,
    lock: RwLock<()>,
}

impl ProjectionGuard {
    pub fn new(stale: bool) -> Self {
        Self {
            stale: AtomicBool::new(stale),
            lock: RwLock::new(()),
        }
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Rebuild unconditionally under the write guard. A failed build leaves the projection stale.
    pub async fn rebuild<F, Fut, E>(&self, build: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let _write = self.lock.write().await;
        self.rebuild_locked(build).await
    }

    /// Rebuild if stale (re-checked under the write guard), then return a read guard to hold
    /// while the projection is queried.
    pub async fn fresh<F, Fut, E>(&self, build: F) -> Result<RwLockReadGuard<'_, ()>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if self.is_stale() {
            let _write = self.lock.write().await;
            if self.is_stale() {
                self.rebuild_locked(build).await?;
            }
        }
        Ok(self.lock.read().await)
    }

    async fn rebuild_locked<F, Fut, E>(&self, build: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        // Cleared first so mutations landing during the build mark it stale again.
        self.stale.store(false, Ordering::SeqCst);
        let result = build().await;
        if result.is_err() {
            self.mark_stale();
        }
        result
    }
}
