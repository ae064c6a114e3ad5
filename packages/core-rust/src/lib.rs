//! `cachelock` core: entity keys, write validation, the cache lock protocol,
//! batch splitting and result aggregation. Performs no I/O.

pub mod aggregate;
pub mod batch;
pub mod error;
pub mod key;
pub mod lock;
pub mod types;
pub mod validation;

pub use aggregate::{aggregate, conform};
pub use batch::{split, DEFAULT_PUT_MULTI_LIMIT};
pub use error::{KeyResult, MultiError, PutError, StoreError, ValidationError, WriteError};
pub use key::{Key, KeyId};
pub use lock::{CacheItem, LockProtocol, LockSet, DEFAULT_CACHE_KEY_PREFIX, DEFAULT_LOCK_EXPIRATION};
pub use types::{Value, ValueKind};
pub use validation::check_keys_values;
