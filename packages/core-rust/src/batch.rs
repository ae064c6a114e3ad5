//! Splits a write into sub-batches that respect the store's per-call limit.

use std::ops::Range;

/// Per-call key limit of the reference backing store.
pub const DEFAULT_PUT_MULTI_LIMIT: usize = 500;

/// Returns `ceil(len / limit)` contiguous ranges covering `0..len` in order.
///
/// Range `i` is `i * limit .. min((i + 1) * limit, len)`. The same ranges
/// are used to place sub-batch results back at their original positions.
/// A `limit` of zero is treated as one.
#[must_use]
pub fn split(len: usize, limit: usize) -> Vec<Range<usize>> {
    debug_assert!(limit > 0, "put limit must be positive");
    let limit = limit.max(1);
    (0..len.div_ceil(limit))
        .map(|i| {
            let lo = i * limit;
            lo..(lo + limit).min(len)
        })
        .collect()
}
