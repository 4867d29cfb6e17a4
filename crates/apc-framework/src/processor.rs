//! # Request Processing
//!
//! A [`RequestProcessor`] is the target-side callback object the mailbox
//! hands each drained [`Request`] to. Processing a request:
//!
//! 1. binds a single-use [`Responder`] to the request's continuation,
//! 2. runs the application logic with it,
//! 3. on failure, if the request is still unanswered, resolves the handler
//!    chain (request-scoped, then actor default) and answers with its result.
//!
//! The same applies to continuations the behavior registers while serving
//! the request: a failing continuation answers the request it belongs to.
//!
//! If every handle on the responder is dropped without an answer the caller
//! receives [`ActorError::Dropped`], so a continuation always runs exactly
//! once.

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ActorError;
use crate::exception::{self, ExceptionHandler};
use crate::mailbox::Mailbox;
use crate::message::{Outcome, Request, RequestId, Response, ResponseProcessor};
use crate::payload::Payload;
use crate::source::RequestSource;

pub trait RequestProcessor: Send + Sync + 'static {
    /// The default handler applied to requests that carry none of their own.
    fn exception_handler(&self) -> Option<ExceptionHandler>;

    /// Replaces the default handler and returns the previous one.
    fn set_exception_handler(&self, handler: Option<ExceptionHandler>) -> Option<ExceptionHandler>;

    /// Consumes one request drained from the mailbox.
    fn process_request(&self, request: Request);
}

struct Reply {
    mailbox: Arc<Mailbox>,
    source: Arc<dyn RequestSource>,
    response_processor: ResponseProcessor,
}

/// Where the answer to one request goes. Answering empties the slot.
struct ReplySlot {
    request_id: RequestId,
    reply: Mutex<Option<Reply>>,
}

impl ReplySlot {
    fn complete(&self, outcome: Outcome) -> bool {
        let Some(reply) = self.reply.lock().take() else {
            return false;
        };
        let response = Response::new(self.request_id, outcome, reply.response_processor);
        reply.source.response_from(&reply.mailbox, response);
        true
    }

    fn is_answered(&self) -> bool {
        self.reply.lock().is_none()
    }
}

impl Drop for ReplySlot {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.get_mut().take() {
            warn!(request_id = %self.request_id, "Request dropped without a response");
            let response = Response::new(self.request_id, Err(ActorError::Dropped), reply.response_processor);
            reply.source.response_from(&reply.mailbox, response);
        }
    }
}

/// The single-use answer handle given to application logic with a request.
///
/// A responder may be moved into a continuation and answered later, from
/// another dispatch cycle.
pub struct Responder {
    slot: Arc<ReplySlot>,
}

impl Responder {
    pub fn request_id(&self) -> RequestId {
        self.slot.request_id
    }

    pub fn respond(self, outcome: Outcome) {
        if !self.slot.complete(outcome) {
            debug!(request_id = %self.slot.request_id, "Request already answered; response dropped");
        }
    }

    pub fn ok<T: std::any::Any + Send>(self, value: T) {
        self.respond(Ok(Payload::new(value)))
    }

    pub fn err(self, error: ActorError) {
        self.respond(Err(error))
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("request_id", &self.slot.request_id)
            .finish()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<RequestScope>> = const { RefCell::new(None) };
}

/// The request an actor is serving. It stays current on the worker while the
/// behavior runs and again while any continuation registered by it runs.
#[derive(Clone)]
struct RequestScope {
    actor: Arc<str>,
    slot: Arc<ReplySlot>,
    processor: Arc<dyn RequestProcessor>,
    handler: Option<ExceptionHandler>,
}

impl RequestScope {
    fn current() -> Option<Self> {
        CURRENT.with(|c| c.borrow().clone())
    }

    fn enter(scope: Option<Self>) -> ScopeGuard {
        ScopeGuard {
            previous: CURRENT.with(|c| c.replace(scope)),
        }
    }

    /// Answers the request through the handler chain unless it was
    /// already answered. The actor default is read now.
    fn fail(&self, error: ActorError) {
        let request_id = self.slot.request_id;
        if self.slot.is_answered() {
            warn!(actor = %self.actor, %request_id, error = %error, "Failure after response was sent; dropped");
            return;
        }
        warn!(actor = %self.actor, %request_id, error = %error, "Request failed");
        let actor_default = self.processor.exception_handler();
        let outcome = exception::resolve(self.handler.as_ref(), actor_default.as_ref(), error);
        self.slot.complete(outcome);
    }
}

struct ScopeGuard {
    previous: Option<RequestScope>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The replaced scope may hold the last reference to a slot, whose
        // drop delivers a response; release it outside the borrow.
        let replaced = CURRENT.with(|c| c.replace(previous));
        drop(replaced);
    }
}

fn run_in_scope<F>(scope: &RequestScope, f: F)
where
    F: FnOnce() -> Result<(), ActorError>,
{
    let result = {
        let _scope = RequestScope::enter(Some(scope.clone()));
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(panic) => Err(ActorError::from_panic(panic)),
        }
    };
    if let Err(error) = result {
        scope.fail(error);
    }
}

/// Runs `invoke` for `request` on the target side and guarantees the
/// request's continuation is answered exactly once.
pub(crate) fn process<F>(mailbox: &Arc<Mailbox>, actor: &Arc<str>, request: Request, invoke: F)
where
    F: FnOnce(Payload, Responder) -> Result<(), ActorError>,
{
    let parts = request.into_parts();
    let slot = Arc::new(ReplySlot {
        request_id: parts.id,
        reply: Mutex::new(Some(Reply {
            mailbox: Arc::clone(mailbox),
            source: parts.source,
            response_processor: parts.response_processor,
        })),
    });
    let scope = RequestScope {
        actor: Arc::clone(actor),
        slot: Arc::clone(&slot),
        processor: parts.processor,
        handler: parts.exception_handler,
    };
    let responder = Responder { slot };
    let payload = parts.payload;

    run_in_scope(&scope, || invoke(payload, responder));
}

/// Binds `response_processor` to the request being served on this thread.
/// A panic or error in the continuation then answers that request through
/// its handler chain. Outside of any request it is returned unchanged.
pub(crate) fn bind_to_current_request(response_processor: ResponseProcessor) -> ResponseProcessor {
    let Some(scope) = RequestScope::current() else {
        return response_processor;
    };
    ResponseProcessor::try_new(move |outcome| {
        run_in_scope(&scope, || response_processor.process(outcome));
        Ok(())
    })
}

/// Runs `f` with no request current, as a synchronous call does.
pub(crate) fn detached<R>(f: impl FnOnce() -> R) -> R {
    let _scope = RequestScope::enter(None);
    f()
}
