//! Error types for the write path.
//!
//! Errors come in two shapes that callers must be able to tell apart:
//! a single error covering a whole call ([`PutError::Wholesale`]) and a
//! positional collection with one slot per key ([`MultiError`]).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::key::Key;
use crate::types::ValueKind;

/// Local input-shape failures, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("keys and values have different lengths ({keys} keys, {values} values)")]
    LengthMismatch { keys: usize, values: usize },

    #[error("values are not homogeneous: index {index} is {found}, expected {expected}")]
    MixedValueKinds {
        index: usize,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("invalid key at index {index}: {key}")]
    InvalidKey { index: usize, key: String },
}

/// Failure of one key, or of a whole sub-batch.
///
/// Cloneable so that a wholesale sub-batch failure can be replicated into
/// every slot it covers.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("write cancelled")]
    Cancelled,

    #[error("write deadline exceeded")]
    DeadlineExceeded,

    #[error("cache {op} failed: {cause:#}")]
    Cache {
        op: &'static str,
        cause: Arc<anyhow::Error>,
    },

    #[error("{len} keys exceed the backing store limit of {limit} per call")]
    TooManyKeys { len: usize, limit: usize },

    #[error("entity rejected: {reason}")]
    Rejected { reason: String },

    #[error("backing store error: {cause:#}")]
    Backend { cause: Arc<anyhow::Error> },

    #[error("sub-batch worker failed: {reason}")]
    Worker { reason: String },
}

impl StoreError {
    /// Wraps a cache backend failure for operation `op`.
    #[must_use]
    pub fn cache(op: &'static str, cause: anyhow::Error) -> Self {
        Self::Cache {
            op,
            cause: Arc::new(cause),
        }
    }

    /// Wraps a backing store transport or service failure.
    #[must_use]
    pub fn backend(cause: anyhow::Error) -> Self {
        Self::Backend {
            cause: Arc::new(cause),
        }
    }
}

/// Outcome of one key in a positional result.
pub type KeyResult = Result<Key, StoreError>;

/// Positional per-key results, aligned with the keys of the call that produced it.
///
/// Every slot is either the written key or that key's error; at least one
/// slot is an error.
#[derive(Debug, Clone)]
pub struct MultiError(Vec<KeyResult>);

impl MultiError {
    /// Wraps positional slots.
    #[must_use]
    pub fn new(slots: Vec<KeyResult>) -> Self {
        Self(slots)
    }

    /// All slots, in input order.
    #[must_use]
    pub fn slots(&self) -> &[KeyResult] {
        &self.0
    }

    #[must_use]
    pub fn into_slots(self) -> Vec<KeyResult> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Error at `index`, or `None` if that key was written (or out of range).
    #[must_use]
    pub fn error_at(&self, index: usize) -> Option<&StoreError> {
        self.0.get(index).and_then(|slot| slot.as_ref().err())
    }

    /// Number of failed slots.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_err()).count()
    }

    /// `(index, error)` for every failed slot.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &StoreError)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().err().map(|e| (i, e)))
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} writes failed", self.failed_count(), self.len())?;
        if let Some((index, first)) = self.errors().next() {
            write!(f, " (first at index {index}: {first})")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

/// Failure of one multi-key store call.
#[derive(Debug, Clone, Error)]
pub enum PutError {
    /// The whole call failed before any per-key distinction was possible.
    #[error(transparent)]
    Wholesale(#[from] StoreError),

    /// Some keys were rejected; slots line up with the call's keys.
    #[error(transparent)]
    Partial(MultiError),
}

/// Failure of a batch write as seen by its caller.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    #[error("invalid write request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Partial(#[from] MultiError),
}

impl WriteError {
    /// Positional results, if the request got past validation.
    #[must_use]
    pub fn as_multi(&self) -> Option<&MultiError> {
        match self {
            Self::Partial(multi) => Some(multi),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_error_reports_failed_slots() {
        let multi = MultiError::new(vec![
            Ok(Key::with_id("Item", 1)),
            Err(StoreError::Rejected {
                reason: "too large".to_string(),
            }),
            Ok(Key::with_id("Item", 3)),
        ]);

        assert_eq!(multi.failed_count(), 1);
        assert!(multi.error_at(0).is_none());
        assert!(matches!(multi.error_at(1), Some(StoreError::Rejected { .. })));
        assert_eq!(multi.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            multi.to_string(),
            "1 of 3 writes failed (first at index 1: entity rejected: too large)"
        );
    }

    #[test]
    fn cache_error_renders_cause_chain() {
        let cause = anyhow::anyhow!("connection refused").context("dial cache");
        let err = StoreError::cache("set_multi", cause);
        assert_eq!(
            err.to_string(),
            "cache set_multi failed: dial cache: connection refused"
        );
    }

    #[test]
    fn validation_converts_into_write_error() {
        let err: WriteError = ValidationError::LengthMismatch { keys: 2, values: 1 }.into();
        assert!(err.as_multi().is_none());
        assert_eq!(
            err.to_string(),
            "invalid write request: keys and values have different lengths (2 keys, 1 values)"
        );
    }
}
