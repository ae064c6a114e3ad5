//! Recording collaborators shared by the client and transaction tests.
//!
//! The cache and the store append to one [`CallLog`] so tests can assert the
//! order of lock-set, store write and lock-delete across collaborators.

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachelock_core::{
    CacheItem, Key, KeyId, KeyResult, LockProtocol, MultiError, PutError, StoreError, Value,
    DEFAULT_PUT_MULTI_LIMIT,
};
use parking_lot::Mutex;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::context::WriteContext;
use crate::traits::{BackingStore, Cacher, ErrorReporter};
use crate::transaction::WriteLockTransaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    NewContext,
    SetMulti(Vec<String>),
    PutMulti(Vec<Key>),
    DeleteMulti(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingCache
// ---------------------------------------------------------------------------

pub struct RecordingCache {
    log: CallLog,
    fail_new_context: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
}

impl RecordingCache {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_new_context: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_new_context(&self, fail: bool) {
        self.fail_new_context.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Cacher for RecordingCache {
    fn new_context(&self, ctx: &WriteContext) -> anyhow::Result<WriteContext> {
        self.log.push(Call::NewContext);
        if self.fail_new_context.load(Ordering::SeqCst) {
            anyhow::bail!("cache context unavailable");
        }
        Ok(ctx.child())
    }

    async fn set_multi(&self, _ctx: &WriteContext, items: &[CacheItem]) -> anyhow::Result<()> {
        self.log
            .push(Call::SetMulti(items.iter().map(|i| i.key.clone()).collect()));
        if self.fail_set.load(Ordering::SeqCst) {
            anyhow::bail!("cache set failed");
        }
        Ok(())
    }

    async fn delete_multi(&self, _ctx: &WriteContext, keys: &[String]) -> anyhow::Result<()> {
        self.log.push(Call::DeleteMulti(keys.to_vec()));
        if self.fail_delete.load(Ordering::SeqCst) {
            anyhow::bail!("cache delete failed");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

type WholesalePredicate = Box<dyn Fn(&[Key]) -> bool + Send + Sync>;

pub struct RecordingStore {
    log: CallLog,
    limit: usize,
    calls: AtomicUsize,
    next_id: AtomicI64,
    wholesale: Mutex<Option<WholesalePredicate>>,
    rejected_ids: Mutex<HashSet<i64>>,
    delay: Mutex<Option<Duration>>,
    duplicate_last: AtomicBool,
}

impl RecordingStore {
    fn new(log: CallLog, limit: usize) -> Self {
        Self {
            log,
            limit,
            calls: AtomicUsize::new(0),
            next_id: AtomicI64::new(1_000_000),
            wholesale: Mutex::new(None),
            rejected_ids: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            duplicate_last: AtomicBool::new(false),
        }
    }

    /// Fails a whole call when `predicate` holds for its keys.
    pub fn fail_wholesale_when(&self, predicate: impl Fn(&[Key]) -> bool + Send + Sync + 'static) {
        *self.wholesale.lock() = Some(Box::new(predicate));
    }

    /// Rejects, positionally, every key with one of these numeric ids.
    pub fn reject_ids(&self, ids: &[i64]) {
        self.rejected_ids.lock().extend(ids.iter().copied());
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Makes successful calls return one key more than they were given.
    pub fn duplicate_last_key(&self, duplicate: bool) {
        self.duplicate_last.store(duplicate, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Key lists of every call, in call order.
    pub fn batches(&self) -> Vec<Vec<Key>> {
        self.log
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PutMulti(keys) => Some(keys),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BackingStore for RecordingStore {
    fn put_multi_limit(&self) -> usize {
        self.limit
    }

    async fn put_multi(
        &self,
        _ctx: &WriteContext,
        keys: &[Key],
        _values: &[Value],
    ) -> Result<Vec<Key>, PutError> {
        self.log.push(Call::PutMulti(keys.to_vec()));
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if keys.len() > self.limit {
            return Err(StoreError::TooManyKeys {
                len: keys.len(),
                limit: self.limit,
            }
            .into());
        }
        if self.wholesale.lock().as_ref().is_some_and(|p| p(keys)) {
            return Err(StoreError::backend(anyhow::anyhow!("store unavailable")).into());
        }

        let rejected = self.rejected_ids.lock().clone();
        let slots: Vec<KeyResult> = keys
            .iter()
            .map(|key| match key.id {
                KeyId::Id(id) if rejected.contains(&id) => Err(StoreError::Rejected {
                    reason: format!("id {id} rejected"),
                }),
                KeyId::Incomplete => {
                    Ok(key.completed_with(self.next_id.fetch_add(1, Ordering::SeqCst)))
                }
                _ => Ok(key.clone()),
            })
            .collect();

        if slots.iter().all(Result::is_ok) {
            let mut written: Vec<Key> = slots.into_iter().flatten().collect();
            if self.duplicate_last.load(Ordering::SeqCst) {
                if let Some(last) = written.last().cloned() {
                    written.push(last);
                }
            }
            Ok(written)
        } else {
            Err(PutError::Partial(MultiError::new(slots)))
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, _ctx: &WriteContext, error: &anyhow::Error) {
        self.messages.lock().push(format!("{error:#}"));
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub log: CallLog,
    pub cache: Arc<RecordingCache>,
    pub store: Arc<RecordingStore>,
    pub reporter: Arc<RecordingReporter>,
    locks: LockProtocol,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_PUT_MULTI_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        let log = CallLog::default();
        Self {
            cache: Arc::new(RecordingCache::new(log.clone())),
            store: Arc::new(RecordingStore::new(log.clone(), limit)),
            reporter: Arc::new(RecordingReporter::default()),
            locks: LockProtocol::default(),
            log,
        }
    }

    pub fn txn(&self) -> WriteLockTransaction {
        WriteLockTransaction::new(
            self.store.clone(),
            self.cache.clone(),
            self.reporter.clone(),
            self.locks.clone(),
        )
    }

    pub fn client(&self) -> Client {
        self.client_with(ClientConfig::default())
    }

    pub fn client_with(&self, config: ClientConfig) -> Client {
        Client::builder(self.store.clone(), self.cache.clone())
            .reporter(self.reporter.clone())
            .config(config)
            .build()
            .expect("test config is valid")
    }

    /// Lock slots the transaction should set for `keys`.
    pub fn lock_keys(&self, keys: &[Key]) -> Vec<String> {
        keys.iter()
            .filter(|k| k.is_complete())
            .map(|k| self.locks.cache_key(k))
            .collect()
    }
}

/// `Item` keys with the given numeric ids.
pub fn item_keys(ids: Range<i64>) -> Vec<Key> {
    ids.map(|id| Key::with_id("Item", id)).collect()
}

/// `n` small map entities.
pub fn entities(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let mut props = BTreeMap::new();
            props.insert("seq".to_string(), Value::Int(i64::try_from(i).unwrap_or(i64::MAX)));
            Value::Map(props)
        })
        .collect()
}
