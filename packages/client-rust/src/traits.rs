use async_trait::async_trait;
use cachelock_core::{CacheItem, Key, PutError, Value, DEFAULT_PUT_MULTI_LIMIT};

use crate::context::WriteContext;

/// Durable key-value system of record.
/// Implementations: the in-memory store (tests, demos), remote datastores.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Maximum number of keys accepted by one [`put_multi`](Self::put_multi) call.
    fn put_multi_limit(&self) -> usize {
        DEFAULT_PUT_MULTI_LIMIT
    }

    /// Writes `values[i]` under `keys[i]`, returning the stored keys in input
    /// order (incomplete keys come back completed).
    ///
    /// A failure is either wholesale or positional; positional errors must
    /// have exactly one slot per input key.
    async fn put_multi(
        &self,
        ctx: &WriteContext,
        keys: &[Key],
        values: &[Value],
    ) -> Result<Vec<Key>, PutError>;
}

/// Cache backend holding entity copies and lock items.
/// Every operation treats empty input as a successful no-op.
#[async_trait]
pub trait Cacher: Send + Sync {
    /// Derives the context used for this client's cache calls.
    fn new_context(&self, ctx: &WriteContext) -> anyhow::Result<WriteContext>;

    /// Stores every item, overwriting existing slots.
    async fn set_multi(&self, ctx: &WriteContext, items: &[CacheItem]) -> anyhow::Result<()>;

    /// Removes every listed slot. Missing slots are not an error.
    async fn delete_multi(&self, ctx: &WriteContext, keys: &[String]) -> anyhow::Result<()>;
}

/// Sink for failures that must not become the result of the call that hit them.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, ctx: &WriteContext, error: &anyhow::Error);
}
