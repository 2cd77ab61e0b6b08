//! src/error.rs
//! ============================================================================
//! # Error types for event dispatch and the singleton service
//!
//! Every failure is surfaced synchronously to the caller. Nothing here is
//! retried or swallowed; a missing handler is not an error at all.

use compact_str::CompactString;
use thiserror::Error;

use crate::registry::{EventId, Signature};

pub type EventResult<T> = Result<T, EventError>;

/// Failures raised while combining or invoking handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Event {id}: handler {found} is incompatible with registered {expected}")]
    IncompatibleHandler {
        id: EventId,
        expected: CompactString,
        found: CompactString,
    },

    #[error("Event {id}: expected {expected} argument(s), got {found}")]
    ArityMismatch {
        id: EventId,
        expected: usize,
        found: usize,
    },

    #[error("Event {id}: argument {index} is not of type {expected}")]
    ArgumentTypeMismatch {
        id: EventId,
        index: usize,
        expected: &'static str,
    },

    #[error("Event {id}: cannot cast result of type {found} to {expected}")]
    ResultCast {
        id: EventId,
        expected: &'static str,
        found: &'static str,
    },
}

impl EventError {
    #[inline]
    pub(crate) fn incompatible(id: EventId, expected: &Signature, found: &Signature) -> Self {
        Self::IncompatibleHandler {
            id,
            expected: CompactString::new(expected.to_string()),
            found: CompactString::new(found.to_string()),
        }
    }

    /// The id of the event the failure belongs to
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::IncompatibleHandler { id, .. }
            | Self::ArityMismatch { id, .. }
            | Self::ArgumentTypeMismatch { id, .. }
            | Self::ResultCast { id, .. } => *id,
        }
    }

    /// True when the call site passed arguments the handler chain cannot accept.
    /// No handler has run when this is returned.
    #[inline]
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::ArityMismatch { .. } | Self::ArgumentTypeMismatch { .. }
        )
    }
}

/// Failures raised by [`crate::singleton::Singletons`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SingletonError {
    #[error("Singleton {type_name} already has a live instance")]
    AlreadyInstalled { type_name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EventError::ArityMismatch {
            id: 3,
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "Event 3: expected 1 argument(s), got 2");
        assert!(err.is_argument_error());
        assert_eq!(err.event_id(), 3);

        let err = EventError::ResultCast {
            id: 7,
            expected: "i32",
            found: "alloc::string::String",
        };
        assert!(!err.is_argument_error());
        assert!(err.to_string().contains("to i32"));
    }

    #[test]
    fn test_singleton_error_message() {
        let err = SingletonError::AlreadyInstalled { type_name: "Audio" };
        assert_eq!(err.to_string(), "Singleton Audio already has a live instance");
    }
}
