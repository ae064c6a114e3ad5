//! Default [`ErrorReporter`] that logs through `tracing`.

use crate::context::WriteContext;
use crate::traits::ErrorReporter;

/// Logs reported errors at `warn` level with the write's trace id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, ctx: &WriteContext, error: &anyhow::Error) {
        metrics::counter!("cachelock_reported_errors_total").increment(1);
        tracing::warn!(
            trace_id = %ctx.trace_id,
            tenant = ctx.tenant_id.as_deref().unwrap_or(""),
            error = %format!("{error:#}"),
            "write path error reported"
        );
    }
}
