//! Per-write execution context.
//!
//! [`WriteContext`] carries request identity plus the cancellation and
//! deadline that bound every cache and store call made on behalf of one
//! write. Cancelling a context cancels every context derived from it.

use std::future::Future;
use std::time::Duration;

use cachelock_core::StoreError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context threaded through every cache and store call of a write.
#[derive(Debug, Clone)]
pub struct WriteContext {
    /// Distributed trace identifier for observability.
    pub trace_id: String,
    /// Tenant scope. `None` for single-tenant deployments.
    pub tenant_id: Option<String>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for WriteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteContext {
    /// Creates a root context with a fresh trace id, no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Tightens the deadline to at most `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(self.deadline.map_or(candidate, |d| d.min(candidate)));
        self
    }

    /// Derives a context that is cancelled with this one but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            tenant_id: self.tenant_id.clone(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `fut` unless this context is cancelled or past its deadline first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] or [`StoreError::DeadlineExceeded`] if the
    /// context ends before `fut` completes. `fut` is dropped in that case.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, StoreError>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(StoreError::DeadlineExceeded);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(StoreError::Cancelled),
            () = expired => Err(StoreError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}
