//! Error types for store construction and subscription.
//!
//! Every variant is a contract violation surfaced at the call site before
//! any observable side effect: no listener is registered, no partial tree
//! is wrapped, no partial store escapes. None of these are retried or
//! recovered from at runtime.

use thiserror::Error;

use crate::sub_state::SUB_STATE_MARKER;

/// Errors raised by tagging, store construction, and subscription setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A fragment passed to tagging already defines the reserved marker
    /// field.
    #[error("fragment already defines the reserved marker field `{}`", SUB_STATE_MARKER)]
    DuplicateMarker,

    /// A value passed to tagging is not a map fragment.
    #[error("sub-states are built from map fragments; got a non-map value")]
    NotAFragment,

    /// A top-level state tree entry is not a tagged sub-state.
    #[error("state tree entry `{key}` is not a tagged sub-state")]
    InvalidSubState {
        /// The offending state tree key.
        key: String,
    },

    /// A subscription watch target lacks the sub-state marker.
    #[error("watch target at position {position} is not a tagged sub-state")]
    NotASubState {
        /// Zero-based position of the offending target in the list passed
        /// to the subscription operation.
        position: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = StoreError::InvalidSubState {
            key: "state1".to_string(),
        };
        assert!(err.to_string().contains("state1"));

        let err = StoreError::NotASubState { position: 2 };
        assert!(err.to_string().contains("position 2"));

        assert!(
            StoreError::DuplicateMarker
                .to_string()
                .contains(SUB_STATE_MARKER)
        );
    }
}
