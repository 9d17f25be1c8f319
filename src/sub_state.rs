//! Sub-state tagging.
//!
//! A sub-state is a map fragment that has been marked as an officially
//! subscribable unit. The marker is a reserved field appended by
//! [`create_sub_state`]; store construction and subscription setup both
//! check for it before doing anything observable.
//!
//! # Example
//!
//! ```
//! use spark_store::{create_sub_state, is_sub_state, Value};
//!
//! let fragment = Value::map([("count", Value::from(1))]);
//! let tagged = create_sub_state(fragment).unwrap();
//!
//! assert!(is_sub_state(&tagged));
//! assert_eq!(tagged.get("count"), Some(&Value::Int(1)));
//! ```

use crate::error::StoreError;
use crate::value::Value;

/// Reserved field name proving a fragment was produced by
/// [`create_sub_state`].
///
/// Application fragments must not define this field themselves.
pub const SUB_STATE_MARKER: &str = "__sub_state__";

/// Tag a map fragment as a sub-state.
///
/// Returns a new map with every original field preserved in its original
/// position and the marker field appended.
///
/// # Errors
///
/// - [`StoreError::NotAFragment`] if `fragment` is not a map.
/// - [`StoreError::DuplicateMarker`] if the fragment already defines the
///   reserved marker field. The marker field name is reserved; colliding
///   with it is a programmer error, not a data condition.
pub fn create_sub_state(fragment: Value) -> Result<Value, StoreError> {
    let Value::Map(mut entries) = fragment else {
        return Err(StoreError::NotAFragment);
    };

    if entries.iter().any(|(key, _)| key == SUB_STATE_MARKER) {
        return Err(StoreError::DuplicateMarker);
    }

    entries.push((SUB_STATE_MARKER.to_string(), Value::Bool(true)));
    Ok(Value::Map(entries))
}

/// Check whether a value carries the sub-state marker.
pub fn is_sub_state(value: &Value) -> bool {
    matches!(value.get(SUB_STATE_MARKER), Some(Value::Bool(true)))
}

// =============================================================================
// Tests
// =============================================================================
