//! In-memory collaborators.
//!
//! Provides concrete backends for the [`BackingStore`](crate::traits::BackingStore)
//! and [`Cacher`](crate::traits::Cacher) traits, for tests, demos and
//! single-process deployments.

mod cache;
mod store;

pub use cache::MemoryCache;
pub use store::MemoryStore;
