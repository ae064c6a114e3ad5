//! In-memory [`Cacher`] backed by [`DashMap`].
//!
//! Items carry their own expiry; expired items are invisible to readers and
//! dropped lazily on access.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cachelock_core::CacheItem;
use dashmap::DashMap;

use crate::context::WriteContext;
use crate::traits::Cacher;

struct Entry {
    item: CacheItem,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Concurrent in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live item in `slot`, dropping it if it has expired.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<CacheItem> {
        let now = Instant::now();
        let expired = match self.entries.get(slot) {
            Some(entry) if entry.is_live(now) => return Some(entry.item.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(slot, |_, entry| !entry.is_live(now));
        }
        None
    }

    /// Whether `slot` holds a live lock. Readers that see one must skip the
    /// cache and read from the backing store.
    #[must_use]
    pub fn is_locked(&self, slot: &str) -> bool {
        self.get(slot).is_some_and(|item| item.is_lock())
    }

    /// Number of stored items, including expired ones not yet dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cacher for MemoryCache {
    fn new_context(&self, ctx: &WriteContext) -> anyhow::Result<WriteContext> {
        Ok(ctx.child())
    }

    async fn set_multi(&self, _ctx: &WriteContext, items: &[CacheItem]) -> anyhow::Result<()> {
        let now = Instant::now();
        for item in items {
            let expires_at = (item.expiration > Duration::ZERO).then(|| now + item.expiration);
            self.entries.insert(
                item.key.clone(),
                Entry {
                    item: item.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    async fn delete_multi(&self, _ctx: &WriteContext, keys: &[String]) -> anyhow::Result<()> {
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }
}
