//! # Envelopes
//!
//! The units that travel through mailbox queues. A [`Request`] is built by
//! the target actor when it accepts work and is consumed exactly once by the
//! target's [`RequestProcessor`]. A [`Response`] carries the outcome back to
//! the originating mailbox together with the continuation taken out of the
//! request it answers.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ActorError;
use crate::exception::ExceptionHandler;
use crate::payload::Payload;
use crate::processor::RequestProcessor;
use crate::source::RequestSource;

/// Result delivered to a response continuation.
pub type Outcome = Result<Payload, ActorError>;

/// Process-wide unique identifier of a request, used to pair responses in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req_{}", self.0)
    }
}

/// The caller-side continuation of a request.
///
/// `process` takes `self`, so a continuation can run at most once. The
/// dispatch engine guarantees it runs at least once (see
/// [`Responder`](crate::processor::Responder)).
///
/// A continuation registered through
/// [`ActorContext::send`](crate::ActorContext::send) belongs to the request
/// its actor was serving at the time. If it panics or returns an error, that
/// request is answered through its exception handler chain.
pub struct ResponseProcessor {
    f: Box<dyn FnOnce(Outcome) -> Result<(), ActorError> + Send>,
}

impl ResponseProcessor {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Self::try_new(move |outcome| {
            f(outcome);
            Ok(())
        })
    }

    /// A continuation that may fail.
    pub fn try_new<F>(f: F) -> Self
    where
        F: FnOnce(Outcome) -> Result<(), ActorError> + Send + 'static,
    {
        Self { f: Box::new(f) }
    }

    /// A continuation that expects a response of type `T`.
    ///
    /// A payload of any other type reaches `f` as
    /// [`ActorError::UnexpectedResponse`].
    pub fn typed<T, F>(f: F) -> Self
    where
        T: Any,
        F: FnOnce(Result<T, ActorError>) + Send + 'static,
    {
        Self::new(move |outcome: Outcome| f(outcome.and_then(Payload::take::<T>)))
    }

    /// A continuation that discards the outcome.
    pub fn ignore() -> Self {
        Self::new(|_| {})
    }

    pub fn process(self, outcome: Outcome) -> Result<(), ActorError> {
        (self.f)(outcome)
    }
}

impl fmt::Debug for ResponseProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseProcessor")
    }
}

/// A pending unit of work addressed to an actor.
pub struct Request {
    id: RequestId,
    source: Arc<dyn RequestSource>,
    processor: Arc<dyn RequestProcessor>,
    payload: Payload,
    response_processor: ResponseProcessor,
    exception_handler: Option<ExceptionHandler>,
}

/// The pieces of a consumed [`Request`].
pub struct RequestParts {
    pub id: RequestId,
    pub source: Arc<dyn RequestSource>,
    pub processor: Arc<dyn RequestProcessor>,
    pub payload: Payload,
    pub response_processor: ResponseProcessor,
    pub exception_handler: Option<ExceptionHandler>,
}

impl Request {
    pub fn new(
        source: Arc<dyn RequestSource>,
        processor: Arc<dyn RequestProcessor>,
        payload: Payload,
        response_processor: ResponseProcessor,
    ) -> Self {
        Self {
            id: RequestId::next(),
            source,
            processor,
            payload,
            response_processor,
            exception_handler: None,
        }
    }

    /// Attaches a handler that applies to this request only.
    pub fn with_exception_handler(mut self, handler: Option<ExceptionHandler>) -> Self {
        self.exception_handler = handler;
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn source(&self) -> &Arc<dyn RequestSource> {
        &self.source
    }

    pub fn processor(&self) -> &Arc<dyn RequestProcessor> {
        &self.processor
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn exception_handler(&self) -> Option<&ExceptionHandler> {
        self.exception_handler.as_ref()
    }

    pub fn into_parts(self) -> RequestParts {
        RequestParts {
            id: self.id,
            source: self.source,
            processor: self.processor,
            payload: self.payload,
            response_processor: self.response_processor,
            exception_handler: self.exception_handler,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .field("scoped_handler", &self.exception_handler.is_some())
            .finish()
    }
}

/// The eventual result of a [`Request`].
pub struct Response {
    request_id: RequestId,
    outcome: Outcome,
    response_processor: ResponseProcessor,
}

impl Response {
    pub fn new(request_id: RequestId, outcome: Outcome, response_processor: ResponseProcessor) -> Self {
        Self {
            request_id,
            outcome,
            response_processor,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Hands the outcome to the continuation of the answered request and
    /// returns whatever the continuation returned.
    pub fn deliver(self) -> Result<(), ActorError> {
        self.response_processor.process(self.outcome)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("request_id", &self.request_id)
            .field("ok", &self.outcome.is_ok())
            .finish()
    }
}

/// Anything that travels through a mailbox queue.
#[derive(Debug)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request(_) => "request",
            Message::Response(_) => "response",
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            Message::Request(r) => r.id(),
            Message::Response(r) => r.request_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_request_ids_are_unique_and_increasing() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert!(b > a);
        assert!(a.to_string().starts_with("req_"));
    }

    #[test]
    fn test_typed_continuation_reports_mismatch() {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let rp = ResponseProcessor::typed::<String, _>(move |r| {
            *slot.lock().unwrap() = Some(r.map_err(|e| e.to_string()));
        });
        rp.process(Ok(Payload::new(3_i32))).unwrap();

        let seen = seen.lock().unwrap().take().unwrap();
        assert!(seen.unwrap_err().contains("expected alloc::string::String"));
    }

    #[test]
    fn test_response_delivers_to_continuation() {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let response = Response::new(
            RequestId::next(),
            Ok(Payload::new("pong")),
            ResponseProcessor::typed::<&'static str, _>(move |r| {
                *slot.lock().unwrap() = r.ok();
            }),
        );
        response.deliver().unwrap();
        assert_eq!(*seen.lock().unwrap(), Some("pong"));
    }

    #[test]
    fn test_fallible_continuation_returns_its_error() {
        let rp = ResponseProcessor::try_new(|outcome| {
            outcome?;
            Err(ActorError::msg("rejected"))
        });
        let err = rp.process(Ok(Payload::new(()))).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
    }
}
