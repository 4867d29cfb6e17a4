//! Type-erased application values carried inside envelopes.

use std::any::{type_name, Any};
use std::fmt;

use crate::error::ActorError;

/// An application request or response value.
///
/// Actors of different types share mailboxes, so the value is erased to
/// `dyn Any`. The concrete type name is captured at construction so that
/// errors such as [`ActorError::Unsupported`] can say what was sent.
pub struct Payload {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Payload {
    /// Wraps `value`. Wrapping a `Payload` returns it unchanged.
    pub fn new<T: Any + Send>(value: T) -> Self {
        let value: Box<dyn Any + Send> = Box::new(value);
        match value.downcast::<Payload>() {
            Ok(payload) => *payload,
            Err(value) => Self {
                value,
                type_name: type_name::<T>(),
            },
        }
    }

    /// Name of the concrete type wrapped by this payload.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Recovers the concrete value, or returns the payload untouched.
    pub fn downcast<T: Any>(self) -> Result<T, Payload> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Payload { value, type_name }),
        }
    }

    /// Like [`Payload::downcast`] but reports a mismatch as an [`ActorError`].
    pub fn take<T: Any>(self) -> Result<T, ActorError> {
        self.downcast::<T>()
            .map_err(|p| ActorError::UnexpectedResponse {
                expected: type_name::<T>(),
                found: p.type_name,
            })
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_downcast() {
        let payload = Payload::new(String::from("ping"));
        assert!(payload.is::<String>());
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("ping"));
        assert_eq!(payload.downcast::<String>().unwrap(), "ping");
    }

    #[test]
    fn test_payload_is_not_wrapped_twice() {
        let payload = Payload::new(Payload::new(5_u64));
        assert_eq!(payload.type_name(), "u64");
        assert_eq!(payload.take::<u64>().unwrap(), 5);
    }

    #[test]
    fn test_payload_mismatch_keeps_type_name() {
        let payload = Payload::new(7_u32);
        let payload = payload.downcast::<String>().unwrap_err();
        assert_eq!(payload.type_name(), "u32");

        let err = payload.take::<String>().unwrap_err();
        assert!(matches!(
            err,
            ActorError::UnexpectedResponse { found: "u32", .. }
        ));
    }
}
