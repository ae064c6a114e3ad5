//! In-memory [`BackingStore`] backed by [`DashMap`].
//!
//! Enforces the per-call key limit and a per-entity size limit like a remote
//! datastore would, so split and partial-failure behaviour can be exercised
//! without one.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cachelock_core::{
    Key, KeyResult, MultiError, PutError, StoreError, Value, DEFAULT_PUT_MULTI_LIMIT,
};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::context::WriteContext;
use crate::traits::BackingStore;

/// Default maximum entity size, matching common hosted datastores (1 MiB).
pub const DEFAULT_MAX_ENTITY_BYTES: usize = 1_048_576;

/// Concurrent in-memory entity store.
///
/// Incomplete keys are completed with ids from a process-local counter.
/// Entities larger than the size limit are rejected per key; calls over the
/// key limit fail wholesale.
pub struct MemoryStore {
    entities: DashMap<Key, Value>,
    next_id: AtomicI64,
    limit: usize,
    max_entity_bytes: usize,
    call_sizes: Mutex<Vec<usize>>,
}

impl MemoryStore {
    /// Creates an empty store with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            next_id: AtomicI64::new(1),
            limit: DEFAULT_PUT_MULTI_LIMIT,
            max_entity_bytes: DEFAULT_MAX_ENTITY_BYTES,
            call_sizes: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_entity_bytes(mut self, max: usize) -> Self {
        self.max_entity_bytes = max;
        self
    }

    #[must_use]
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.entities.get(key).map(|v| v.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of keys in each `put_multi` call so far, in call order.
    #[must_use]
    pub fn call_sizes(&self) -> Vec<usize> {
        self.call_sizes.lock().clone()
    }

    fn write_one(&self, key: &Key, value: &Value) -> KeyResult {
        let size = value.estimated_size();
        if size > self.max_entity_bytes {
            return Err(StoreError::Rejected {
                reason: format!(
                    "entity {key} is {size} bytes, limit is {}",
                    self.max_entity_bytes
                ),
            });
        }
        let key = if key.is_complete() {
            key.clone()
        } else {
            key.completed_with(self.next_id.fetch_add(1, Ordering::Relaxed))
        };
        self.entities.insert(key.clone(), value.clone());
        Ok(key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn put_multi_limit(&self) -> usize {
        self.limit
    }

    async fn put_multi(
        &self,
        _ctx: &WriteContext,
        keys: &[Key],
        values: &[Value],
    ) -> Result<Vec<Key>, PutError> {
        self.call_sizes.lock().push(keys.len());

        if keys.len() > self.limit {
            return Err(StoreError::TooManyKeys {
                len: keys.len(),
                limit: self.limit,
            }
            .into());
        }
        if keys.len() != values.len() {
            return Err(StoreError::backend(anyhow::anyhow!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            ))
            .into());
        }

        let slots: Vec<KeyResult> = keys
            .iter()
            .zip(values)
            .map(|(key, value)| self.write_one(key, value))
            .collect();

        if slots.iter().all(Result::is_ok) {
            Ok(slots.into_iter().flatten().collect())
        } else {
            Err(PutError::Partial(MultiError::new(slots)))
        }
    }
}
