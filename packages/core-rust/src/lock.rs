//! Cache lock protocol.
//!
//! Before a key is written to the backing store, a lock item is placed in
//! the cache under the key's cache slot. Readers that find a lock item must
//! bypass the cache and read from the store: the cached value may be older
//! than the write in flight.
//!
//! This module only derives lock keys and items. Setting and deleting them
//! is the caller's job.

use std::time::Duration;

use crate::key::Key;

/// Cache key prefix for entity slots.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "CL1:";

/// How long a lock survives if its writer never deletes it.
pub const DEFAULT_LOCK_EXPIRATION: Duration = Duration::from_secs(32);

/// Flag bit marking a [`CacheItem`] as a lock rather than a cached entity.
pub const LOCK_FLAG: u32 = 1;

/// One cache record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    pub key: String,
    pub value: Vec<u8>,
    pub flags: u32,
    /// Time to live. `Duration::ZERO` means no expiry.
    pub expiration: Duration,
}

impl CacheItem {
    /// Whether this item marks an in-flight write.
    #[must_use]
    pub fn is_lock(&self) -> bool {
        self.flags & LOCK_FLAG != 0
    }
}

/// Lock payload for one sub-batch: the keys to delete afterwards and the
/// items to set beforehand. `cache_keys[i] == items[i].key`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet {
    pub cache_keys: Vec<String>,
    pub items: Vec<CacheItem>,
}

impl LockSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Derives cache slots and lock items for entity keys.
#[derive(Debug, Clone)]
pub struct LockProtocol {
    prefix: String,
    expiration: Duration,
}

impl Default for LockProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_KEY_PREFIX, DEFAULT_LOCK_EXPIRATION)
    }
}

impl LockProtocol {
    #[must_use]
    pub fn new(prefix: impl Into<String>, expiration: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            expiration,
        }
    }

    #[must_use]
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Cache slot for `key`. The read path caches entities under the same slot.
    #[must_use]
    pub fn cache_key(&self, key: &Key) -> String {
        format!("{}{}", self.prefix, key.encode())
    }

    /// Builds the lock set for `keys`. Pure; performs no I/O.
    ///
    /// Incomplete keys are skipped: nothing can be cached for an entity whose
    /// identity does not exist yet.
    #[must_use]
    pub fn acquire(&self, keys: &[Key]) -> LockSet {
        let mut set = LockSet {
            cache_keys: Vec::with_capacity(keys.len()),
            items: Vec::with_capacity(keys.len()),
        };
        for key in keys.iter().filter(|key| key.is_complete()) {
            let cache_key = self.cache_key(key);
            set.items.push(CacheItem {
                key: cache_key.clone(),
                value: lock_token(),
                flags: LOCK_FLAG,
                expiration: self.expiration,
            });
            set.cache_keys.push(cache_key);
        }
        set
    }
}

/// Random payload so lock items are never byte-equal to a cached entity.
fn lock_token() -> Vec<u8> {
    rand::random::<[u8; 4]>().to_vec()
}
