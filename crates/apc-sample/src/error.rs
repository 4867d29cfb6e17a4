//! # Sample Errors
//!
//! [`DemoError`] is what the sample clients return. Behaviors raise it
//! through [`ActorError::failed`]; on the way back the client unwraps it
//! again, so callers match on domain variants instead of transport ones.

use apc_framework::ActorError;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("batch is empty")]
    EmptyBatch,

    #[error("actor communication failed: {0}")]
    Actor(#[source] ActorError),

    #[error("failed to start the demo system: {0}")]
    Startup(String),
}

impl From<ActorError> for DemoError {
    fn from(e: ActorError) -> Self {
        match e {
            ActorError::Failed(source) => match source.downcast::<DemoError>() {
                Ok(demo) => *demo,
                Err(other) => DemoError::Actor(ActorError::Failed(other)),
            },
            other => DemoError::Actor(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_survives_the_round_trip() {
        let err = DemoError::from(ActorError::failed(DemoError::DivisionByZero));
        assert!(matches!(err, DemoError::DivisionByZero));
    }

    #[test]
    fn test_transport_error_is_wrapped() {
        let err = DemoError::from(ActorError::Dropped);
        assert!(matches!(err, DemoError::Actor(ActorError::Dropped)));
        assert_eq!(err.to_string(), "actor communication failed: request dropped without a response");
    }
}
