//! # Framework Errors
//!
//! Every failure that can reach a response continuation is an [`ActorError`].
//! Failures never cross a mailbox boundary as a raw panic: they are converted
//! into one of these variants and delivered through the normal response path.

/// Errors produced by the dispatch engine or by application behaviors.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The actor does not support synchronous calls for this request kind.
    #[error("unsupported operation: {kind}")]
    Unsupported { kind: &'static str },

    /// The actor was addressed before it was activated.
    #[error("actor {actor} is not active")]
    Inactive { actor: String },

    /// A synchronous call found the target's state held by another thread
    /// that may itself be waiting. Send a request instead.
    #[error("actor {actor} is busy")]
    Busy { actor: String },

    /// Application-level failure raised by a behavior.
    #[error("request failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Application-level failure described by a plain message.
    #[error("{0}")]
    Message(String),

    /// A behavior, exception handler or continuation panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The request was dropped without ever being answered.
    #[error("request dropped without a response")]
    Dropped,

    /// The response payload was not of the type the caller asked for.
    #[error("unexpected response: expected {expected}, found {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },

    /// The thread manager no longer accepts work.
    #[error("thread manager closed")]
    ThreadManagerClosed,
}

impl ActorError {
    /// Wraps any error type as an application failure.
    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ActorError::Failed(Box::new(error))
    }

    /// Builds an application failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        ActorError::Message(message.into())
    }

    /// Turns a caught panic payload into an error.
    pub(crate) fn from_panic(panic: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "<unknown panic>".to_string()
        };
        ActorError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_names_the_kind() {
        let err = ActorError::Unsupported { kind: "alloc::string::String" };
        assert_eq!(err.to_string(), "unsupported operation: alloc::string::String");
    }

    #[test]
    fn test_from_panic_extracts_message() {
        let err = ActorError::from_panic(Box::new("boom"));
        assert!(matches!(err, ActorError::Panicked(ref m) if m == "boom"));

        let err = ActorError::from_panic(Box::new(String::from("bang")));
        assert!(matches!(err, ActorError::Panicked(ref m) if m == "bang"));

        let err = ActorError::from_panic(Box::new(42_u8));
        assert!(matches!(err, ActorError::Panicked(ref m) if m == "<unknown panic>"));
    }

    #[test]
    fn test_failed_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err = ActorError::failed(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
