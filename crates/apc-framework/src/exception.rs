//! # Exception Handlers
//!
//! Once a request crosses an asynchronous boundary there is no call stack to
//! unwind into, so failures raised by a behavior are offered to an
//! [`ExceptionHandler`] instead. Lookup order at the target is:
//!
//! 1. the handler attached to the request itself (request-scoped),
//! 2. the actor's default handler, read at delivery time,
//! 3. none, in which case the failure is sent back as the response.
//!
//! Handlers are immutable and shared by `Arc`, so one in-flight request can
//! never observe a handler change made on behalf of another.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ActorError;
use crate::message::Outcome;
use crate::payload::Payload;

type HandlerFn = dyn Fn(ActorError) -> Outcome + Send + Sync;

/// A recovery strategy for failures raised while processing a request.
///
/// The handler either recovers with a replacement response value or returns
/// an error (possibly a different one) that becomes the failure response.
#[derive(Clone)]
pub struct ExceptionHandler {
    f: Arc<HandlerFn>,
}

impl ExceptionHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ActorError) -> Outcome + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// A handler that answers every failure with a clone of `value`.
    pub fn recover_with<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::new(move |_| Ok(Payload::new(value.clone())))
    }

    /// Runs the handler. A panicking handler yields [`ActorError::Panicked`].
    pub fn handle(&self, error: ActorError) -> Outcome {
        match catch_unwind(AssertUnwindSafe(|| (self.f)(error))) {
            Ok(outcome) => outcome,
            Err(panic) => Err(ActorError::from_panic(panic)),
        }
    }

    pub fn ptr_eq(&self, other: &ExceptionHandler) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExceptionHandler")
    }
}

/// Applies the handler chain to a failure.
pub(crate) fn resolve(
    scoped: Option<&ExceptionHandler>,
    actor_default: Option<&ExceptionHandler>,
    error: ActorError,
) -> Outcome {
    match scoped.or(actor_default) {
        Some(handler) => handler.handle(error),
        None => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_with_replaces_failure() {
        let handler = ExceptionHandler::recover_with(String::from("recovered"));
        let outcome = handler.handle(ActorError::msg("bad"));
        assert_eq!(outcome.unwrap().take::<String>().unwrap(), "recovered");
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let handler = ExceptionHandler::new(|_| panic!("handler exploded"));
        let outcome = handler.handle(ActorError::msg("bad"));
        assert!(matches!(outcome, Err(ActorError::Panicked(ref m)) if m == "handler exploded"));
    }

    #[test]
    fn test_scoped_handler_takes_precedence() {
        let scoped = ExceptionHandler::recover_with("scoped");
        let default = ExceptionHandler::recover_with("default");

        let outcome = resolve(Some(&scoped), Some(&default), ActorError::msg("x"));
        assert_eq!(outcome.unwrap().take::<&str>().unwrap(), "scoped");

        let outcome = resolve(None, Some(&default), ActorError::msg("x"));
        assert_eq!(outcome.unwrap().take::<&str>().unwrap(), "default");
    }

    #[test]
    fn test_unhandled_failure_passes_through() {
        let outcome = resolve(None, None, ActorError::msg("raw"));
        assert_eq!(outcome.unwrap_err().to_string(), "raw");
    }
}
