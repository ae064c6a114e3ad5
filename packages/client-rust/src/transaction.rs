//! Single-batch write-lock transaction.
//!
//! [`WriteLockTransaction::run`] writes one sub-batch (at most the store's
//! per-call limit) as:
//!
//! 1. derive lock items for the keys
//! 2. derive the cache context (failure aborts with no mutation)
//! 3. set the lock items in the cache
//! 4. write the entities to the backing store (skipped if step 3 failed)
//! 5. delete the lock items, whatever happened in steps 3 and 4
//!
//! The result is the store's result. A failure in step 5 goes to the
//! [`ErrorReporter`] and never replaces it.

use std::sync::Arc;

use anyhow::Context as _;
use cachelock_core::{Key, LockProtocol, LockSet, PutError, StoreError, Value};

use crate::context::WriteContext;
use crate::traits::{BackingStore, Cacher, ErrorReporter};

/// Collaborators needed to write one sub-batch. Cheap to clone.
#[derive(Clone)]
pub struct WriteLockTransaction {
    store: Arc<dyn BackingStore>,
    cacher: Arc<dyn Cacher>,
    reporter: Arc<dyn ErrorReporter>,
    locks: Arc<LockProtocol>,
}

impl WriteLockTransaction {
    #[must_use]
    pub fn new(
        store: Arc<dyn BackingStore>,
        cacher: Arc<dyn Cacher>,
        reporter: Arc<dyn ErrorReporter>,
        locks: LockProtocol,
    ) -> Self {
        Self {
            store,
            cacher,
            reporter,
            locks: Arc::new(locks),
        }
    }

    /// Locks, writes and unlocks one sub-batch.
    ///
    /// `keys` and `values` must already be validated and within the store limit.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged, or a wholesale error if the cache
    /// context could not be derived, the locks could not be set, or `ctx`
    /// ended first.
    pub async fn run(
        &self,
        ctx: &WriteContext,
        keys: &[Key],
        values: &[Value],
    ) -> Result<Vec<Key>, PutError> {
        let lock_set = self.locks.acquire(keys);

        let cache_ctx = self
            .cacher
            .new_context(ctx)
            .map_err(|e| StoreError::cache("new_context", e))?;

        let result = self.lock_and_put(ctx, &cache_ctx, &lock_set, keys, values).await;
        self.release(ctx, &cache_ctx, &lock_set).await;
        result
    }

    async fn lock_and_put(
        &self,
        ctx: &WriteContext,
        cache_ctx: &WriteContext,
        lock_set: &LockSet,
        keys: &[Key],
        values: &[Value],
    ) -> Result<Vec<Key>, PutError> {
        cache_ctx
            .run(self.cacher.set_multi(cache_ctx, &lock_set.items))
            .await?
            .map_err(|e| StoreError::cache("set_multi", e))?;
        tracing::debug!(locks = lock_set.len(), "cache locks set");

        let result = ctx.run(self.store.put_multi(ctx, keys, values)).await?;
        tracing::debug!(keys = keys.len(), ok = result.is_ok(), "backing store put complete");
        result
    }

    /// Deletes the lock items; failures are reported, not returned.
    async fn release(&self, ctx: &WriteContext, cache_ctx: &WriteContext, lock_set: &LockSet) {
        let outcome = match cache_ctx
            .run(self.cacher.delete_multi(cache_ctx, &lock_set.cache_keys))
            .await
        {
            Ok(deleted) => deleted,
            Err(interrupted) => Err(anyhow::Error::new(interrupted)),
        };

        if let Err(e) = outcome.context("put_multi cache delete_multi") {
            metrics::counter!("cachelock_lock_release_failures_total").increment(1);
            self.reporter.report(ctx, &e);
        }
    }
}
