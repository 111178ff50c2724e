use crate::listener::ListenerId;
use crate::types::TypeKey;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BlackboardError {
    #[error("Invalid argument: {msg}")]
    InvalidArgument { msg: String },

    #[error("Cannot bind `{capability}` to `{event}`: {reason}")]
    InvalidBinding {
        capability: TypeKey,
        event: TypeKey,
        reason: String,
    },

    #[error("No suitable handler method for `{event}` was found in `{capability}`.")]
    NoHandlerFound { capability: TypeKey, event: TypeKey },

    #[error(
        "`{capability}` has multiple handler methods for `{event}`. \
         `{accepted}` was already accepted as the method, but `{duplicate}` was found also."
    )]
    AmbiguousHandler {
        capability: TypeKey,
        event: TypeKey,
        accepted: &'static str,
        duplicate: &'static str,
    },

    #[error(
        "Method `{method}` in `{declared_in}` (checked for `{capability}`) is incorrectly constructed: {reason}"
    )]
    InvalidHandlerShape {
        capability: TypeKey,
        declared_in: TypeKey,
        method: &'static str,
        reason: String,
    },

    #[error(
        "Duplicate registration. Tried to register `{capability}` for `{event}`, \
         which is already bound to `{existing}`."
    )]
    DuplicateRegistration {
        capability: TypeKey,
        event: TypeKey,
        existing: TypeKey,
    },

    #[error("`{listener}` or any of its contracts were not previously registered as a capability.")]
    NoMatchingRegistration { listener: &'static str },

    #[error("`{event}` was not registered.")]
    EventNotRegistered { event: TypeKey },

    #[error("Handler `{method}` of `{capability}` failed on listener {listener} for `{event}`: {source}")]
    HandlerInvocationFailed {
        capability: TypeKey,
        method: &'static str,
        event: &'static str,
        listener: ListenerId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BlackboardError {
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, BlackboardError::DuplicateRegistration { .. })
    }
}

/// A handler panicked instead of returning an error.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {message}")]
pub struct HandlerPanic {
    pub message: String,
}
