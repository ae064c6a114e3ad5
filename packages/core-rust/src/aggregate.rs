//! Reassembles per-sub-batch results into one result aligned with the input.

use std::ops::Range;

use crate::error::{KeyResult, MultiError, PutError, StoreError};
use crate::key::Key;

/// Merges sub-batch outcomes, in sub-batch order, into one positional result.
///
/// `ranges` must be the contiguous, ordered ranges the request was split
/// into (see [`split`](crate::batch::split)) and `results[i]` the outcome
/// for `ranges[i]`.
///
/// If every sub-batch succeeded the keys are concatenated. Otherwise each
/// slot of the returned [`MultiError`] holds the key or error for that
/// input position: positional sub-batch errors are merged slot by slot and
/// wholesale errors are repeated across the sub-batch's range.
///
/// A sub-batch whose result length does not match its range is treated as a
/// wholesale backend failure for that range.
///
/// # Errors
///
/// Returns the merged [`MultiError`] if any slot failed.
pub fn aggregate(
    ranges: &[Range<usize>],
    results: Vec<Result<Vec<Key>, PutError>>,
) -> Result<Vec<Key>, MultiError> {
    debug_assert_eq!(ranges.len(), results.len());
    let total = ranges.last().map_or(0, |range| range.end);

    let results: Vec<_> = ranges
        .iter()
        .zip(results)
        .map(|(range, result)| conform(range, result))
        .collect();

    if results.iter().all(Result::is_ok) {
        let mut keys = Vec::with_capacity(total);
        for batch in results.into_iter().flatten() {
            keys.extend(batch);
        }
        return Ok(keys);
    }

    let mut slots: Vec<KeyResult> = Vec::with_capacity(total);
    for (range, result) in ranges.iter().zip(results) {
        match result {
            Ok(keys) => slots.extend(keys.into_iter().map(Ok)),
            Err(PutError::Partial(multi)) => slots.extend(multi.into_slots()),
            Err(PutError::Wholesale(err)) => {
                slots.extend(range.clone().map(|_| Err(err.clone())));
            }
        }
    }
    Err(MultiError::new(slots))
}

/// Replaces a result whose length disagrees with `range` by a wholesale
/// backend error, so a malformed store reply never misaligns keys.
///
/// # Errors
///
/// Returns `result`'s own error, or the backend error for a wrong length.
pub fn conform(
    range: &Range<usize>,
    result: Result<Vec<Key>, PutError>,
) -> Result<Vec<Key>, PutError> {
    let returned = match &result {
        Ok(keys) => keys.len(),
        Err(PutError::Partial(multi)) => multi.len(),
        Err(PutError::Wholesale(_)) => return result,
    };
    if returned == range.len() {
        return result;
    }
    tracing::warn!(
        offset = range.start,
        expected = range.len(),
        returned,
        "backing store returned a result of the wrong length"
    );
    Err(PutError::Wholesale(StoreError::backend(anyhow::anyhow!(
        "backing store returned {returned} results for {} keys",
        range.len()
    ))))
}
