//! `cachelock` client — lock-aware batched writes through a cache to a
//! backing key-value store.

pub mod client;
pub mod config;
pub mod context;
pub mod memory;
pub mod reporter;
pub mod telemetry;
pub mod traits;
pub mod transaction;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use context::WriteContext;
pub use reporter::TracingReporter;
pub use traits::{BackingStore, Cacher, ErrorReporter};
pub use transaction::WriteLockTransaction;
