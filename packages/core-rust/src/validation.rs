//! Shape checks run before a write touches the cache or the backing store.

use crate::error::ValidationError;
use crate::key::Key;
use crate::types::Value;

/// Checks that `keys` and `values` can be written together.
///
/// Fails if the lengths differ, if the values are not all of one kind, or if
/// any key is invalid. An empty request passes; callers treat it as a
/// trivial success without doing any I/O.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, checked in the order above.
pub fn check_keys_values(keys: &[Key], values: &[Value]) -> Result<(), ValidationError> {
    if keys.len() != values.len() {
        return Err(ValidationError::LengthMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }

    if let Some(first) = values.first() {
        let expected = first.kind();
        if let Some((index, found)) = values
            .iter()
            .map(Value::kind)
            .enumerate()
            .find(|(_, kind)| *kind != expected)
        {
            return Err(ValidationError::MixedValueKinds {
                index,
                expected,
                found,
            });
        }
    }

    if let Some((index, key)) = keys.iter().enumerate().find(|(_, key)| !key.is_valid()) {
        return Err(ValidationError::InvalidKey {
            index,
            key: key.to_string(),
        });
    }

    Ok(())
}
