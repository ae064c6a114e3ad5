//! Lock-aware write client.
//!
//! [`Client::put_multi`] validates the request, splits it into sub-batches
//! no larger than the store's per-call limit, runs one
//! [`WriteLockTransaction`] per sub-batch on its own tokio task, waits for
//! all of them, and merges the outcomes back into input order.

use std::sync::Arc;

use cachelock_core::{
    aggregate, check_keys_values, conform, split, Key, KeyResult, PutError, StoreError, Value,
    WriteError,
};
use futures_util::future::join_all;
use tracing::Instrument;

use crate::config::{ClientConfig, ConfigError};
use crate::context::WriteContext;
use crate::reporter::TracingReporter;
use crate::traits::{BackingStore, Cacher, ErrorReporter};
use crate::transaction::WriteLockTransaction;

/// Writes entities through to a backing store while keeping a cache honest.
///
/// Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub struct Client {
    txn: WriteLockTransaction,
    config: Arc<ClientConfig>,
    batch_size: usize,
}

/// Builder for [`Client`]. The error reporter defaults to [`TracingReporter`].
pub struct ClientBuilder {
    store: Arc<dyn BackingStore>,
    cacher: Arc<dyn Cacher>,
    reporter: Arc<dyn ErrorReporter>,
    config: ClientConfig,
}

impl ClientBuilder {
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<Client, ConfigError> {
        self.config.validate()?;
        let batch_size = self
            .config
            .effective_batch_size(self.store.put_multi_limit());
        let txn = WriteLockTransaction::new(
            self.store,
            self.cacher,
            self.reporter,
            self.config.lock_protocol(),
        );
        Ok(Client {
            txn,
            config: Arc::new(self.config),
            batch_size,
        })
    }
}

impl Client {
    #[must_use]
    pub fn builder(store: Arc<dyn BackingStore>, cacher: Arc<dyn Cacher>) -> ClientBuilder {
        ClientBuilder {
            store,
            cacher,
            reporter: Arc::new(TracingReporter),
            config: ClientConfig::default(),
        }
    }

    /// Keys per store call.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Writes `values[i]` under `keys[i]` for every `i`.
    ///
    /// Any number of keys is accepted; requests over the store's limit are
    /// split and written concurrently. On success the returned keys line up
    /// with `keys` (incomplete keys come back completed). An empty request
    /// succeeds without any I/O.
    ///
    /// # Errors
    ///
    /// [`WriteError::Validation`] before any I/O if the input is malformed.
    /// Otherwise [`WriteError::Partial`] with one slot per input key, each
    /// holding the written key or that key's error.
    pub async fn put_multi(
        &self,
        ctx: &WriteContext,
        keys: &[Key],
        values: &[Value],
    ) -> Result<Vec<Key>, WriteError> {
        check_keys_values(keys, values)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let ctx = self.scoped(ctx);
        let ranges = split(keys.len(), self.batch_size);
        let span = tracing::info_span!(
            "put_multi",
            trace_id = %ctx.trace_id,
            keys = keys.len(),
            sub_batches = ranges.len(),
        );

        async {
            metrics::counter!("cachelock_put_keys_total").increment(keys.len() as u64);
            metrics::counter!("cachelock_sub_batches_total").increment(ranges.len() as u64);

            let handles = ranges.iter().cloned().map(|range| {
                let txn = self.txn.clone();
                let ctx = ctx.clone();
                let offset = range.start;
                let batch_keys = keys[range.clone()].to_vec();
                let batch_values = values[range].to_vec();
                tokio::spawn(
                    async move {
                        let result = txn.run(&ctx, &batch_keys, &batch_values).await;
                        if let Err(e) = &result {
                            metrics::counter!("cachelock_sub_batch_failures_total").increment(1);
                            tracing::debug!(offset, error = %e, "sub-batch failed");
                        }
                        result
                    }
                    .in_current_span(),
                )
            });

            let results: Vec<Result<Vec<Key>, PutError>> = join_all(handles)
                .await
                .into_iter()
                .map(|joined| {
                    joined.unwrap_or_else(|e| {
                        Err(PutError::Wholesale(StoreError::Worker {
                            reason: e.to_string(),
                        }))
                    })
                })
                .collect();

            let merged = aggregate(&ranges, results);
            tracing::debug!(ok = merged.is_ok(), "put_multi complete");
            merged.map_err(WriteError::Partial)
        }
        .instrument(span)
        .await
    }

    /// Writes one entity.
    ///
    /// Runs a single write-lock transaction without splitting, on its own
    /// task so the locks are released even if the caller stops waiting.
    ///
    /// # Errors
    ///
    /// The key's own error: a validation error, the store's per-key error
    /// for this entity, or the wholesale error of the call.
    pub async fn put(&self, ctx: &WriteContext, key: &Key, value: &Value) -> Result<Key, StoreError> {
        check_keys_values(std::slice::from_ref(key), std::slice::from_ref(value))?;

        let txn = self.txn.clone();
        let ctx = self.scoped(ctx);
        let keys = vec![key.clone()];
        let values = vec![value.clone()];
        let result = tokio::spawn(
            async move { txn.run(&ctx, &keys, &values).await }.in_current_span(),
        )
        .await
        .unwrap_or_else(|e| {
            Err(PutError::Wholesale(StoreError::Worker {
                reason: e.to_string(),
            }))
        });

        let mut slots: Vec<KeyResult> = match conform(&(0..1), result) {
            Ok(written) => written.into_iter().map(Ok).collect(),
            Err(PutError::Partial(multi)) => multi.into_slots(),
            Err(PutError::Wholesale(e)) => return Err(e),
        };
        slots.pop().unwrap_or_else(|| {
            Err(StoreError::backend(anyhow::anyhow!(
                "backing store returned no result"
            )))
        })
    }

    /// Applies the configured write timeout on top of the caller's context.
    fn scoped(&self, ctx: &WriteContext) -> WriteContext {
        match self.config.write_timeout() {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        }
    }
}
