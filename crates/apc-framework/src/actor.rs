//! # Actors
//!
//! The capability surface every actor exposes, and [`JaActor`], the actor
//! type that wires an application [`Behavior`] to a [`Mailbox`].
//!
//! ## Writing an actor
//!
//! Application logic implements [`Behavior`]. It receives one request at a
//! time together with a [`Responder`]; it may answer at once, forward the
//! work to other actors and answer from a continuation later, or fail and
//! let the exception handler chain decide the response.
//!
//! Actors that can also answer synchronously, on the caller's thread,
//! implement [`SyncBehavior`] and are built with [`JaActor::with_calls`].
//! Whether an actor supports calls is fixed when it is built.
//!
//! ## Lifecycle
//!
//! An actor is inactive until [`TargetActor::activate`] is called. Requests
//! and calls addressed to an inactive actor fail with
//! [`ActorError::Inactive`] and are never queued.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::ActorError;
use crate::exception::ExceptionHandler;
use crate::mailbox::Mailbox;
use crate::message::{Request, ResponseProcessor};
use crate::payload::Payload;
use crate::processor::{self, RequestProcessor, Responder};
use crate::source::{MailboxSource, RequestSource};
use crate::thread_manager::ThreadManager;

/// Asynchronous application logic of an actor.
///
/// Runs on a worker thread, never concurrently with itself.
pub trait Behavior: Send + 'static {
    fn process_request(
        &mut self,
        ctx: &ActorContext,
        request: Payload,
        responder: Responder,
    ) -> Result<(), ActorError>;
}

/// Synchronous application logic, run on the caller's thread.
pub trait SyncBehavior: Behavior {
    fn process_call(&mut self, ctx: &ActorContext, request: Payload) -> Result<Payload, ActorError>;
}

/// The addressable surface of an actor.
pub trait Actor: Send + Sync {
    fn mailbox(&self) -> &Arc<Mailbox>;

    /// Enqueues `payload` for asynchronous processing. The response is
    /// routed back through `source`. A request-scoped `handler` takes
    /// precedence over the actor's default handler.
    fn accept_request_with_handler(
        &self,
        source: &Arc<dyn RequestSource>,
        payload: Payload,
        response_processor: ResponseProcessor,
        handler: Option<ExceptionHandler>,
    ) -> Result<(), ActorError>;

    fn accept_request(
        &self,
        source: &Arc<dyn RequestSource>,
        payload: Payload,
        response_processor: ResponseProcessor,
    ) -> Result<(), ActorError> {
        self.accept_request_with_handler(source, payload, response_processor, None)
    }

    /// Processes `payload` synchronously on the calling thread. Fails with
    /// [`ActorError::Busy`] instead of waiting when the calling thread is a
    /// worker or already inside another actor.
    fn accept_call(&self, source: &Arc<dyn RequestSource>, payload: Payload) -> Result<Payload, ActorError>;

    fn set_initial_buffer_capacity(&self, capacity: usize) {
        self.mailbox().set_initial_buffer_capacity(capacity);
    }
}

/// An actor that can be activated and carries a default exception handler.
pub trait TargetActor: Actor {
    fn activate(&self);

    fn is_active(&self) -> bool;

    /// Replaces the default handler and returns the previous one, so a
    /// caller can restore it afterwards.
    fn set_exception_handler(&self, handler: Option<ExceptionHandler>) -> Option<ExceptionHandler>;

    fn exception_handler(&self) -> Option<ExceptionHandler>;
}

/// What a behavior sees of its own actor while processing.
///
/// Cheap to clone, so it can be moved into response continuations.
#[derive(Clone)]
pub struct ActorContext {
    name: Arc<str>,
    mailbox: Arc<Mailbox>,
    source: Arc<dyn RequestSource>,
}

impl ActorContext {
    fn new(name: Arc<str>, mailbox: Arc<Mailbox>) -> Self {
        let source: Arc<dyn RequestSource> = Arc::new(MailboxSource::new(Arc::clone(&mailbox)));
        Self { name, mailbox, source }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// The source that routes responses back to this actor's mailbox.
    pub fn source(&self) -> &Arc<dyn RequestSource> {
        &self.source
    }

    /// Sends `value` to `target`; `response_processor` later runs on this
    /// actor's worker. Sent while serving a request, the continuation belongs
    /// to that request: if it fails, the request is answered through its
    /// exception handler chain.
    pub fn send<A, T>(&self, target: &A, value: T, response_processor: ResponseProcessor) -> Result<(), ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        let response_processor = processor::bind_to_current_request(response_processor);
        target.accept_request(&self.source, Payload::new(value), response_processor)
    }

    /// Like [`ActorContext::send`] with a handler scoped to this request.
    pub fn send_with_handler<A, T>(
        &self,
        target: &A,
        value: T,
        handler: ExceptionHandler,
        response_processor: ResponseProcessor,
    ) -> Result<(), ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        let response_processor = processor::bind_to_current_request(response_processor);
        target.accept_request_with_handler(&self.source, Payload::new(value), response_processor, Some(handler))
    }

    /// Calls `target` synchronously. Fails with [`ActorError::Busy`] when the
    /// target is processing on another thread, since a worker never waits.
    pub fn call<A, T>(&self, target: &A, value: T) -> Result<Payload, ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        target.accept_call(&self.source, Payload::new(value))
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("name", &self.name)
            .field("mailbox", &self.mailbox.id())
            .finish()
    }
}

type CallFn<B> = fn(&mut B, &ActorContext, Payload) -> Result<Payload, ActorError>;

thread_local! {
    static HELD: Cell<usize> = const { Cell::new(0) };
}

/// Counts the behaviors the current thread holds.
struct Held;

impl Held {
    fn enter() -> Self {
        HELD.with(|h| h.set(h.get() + 1));
        Held
    }

    /// A thread that holds a behavior or drains a mailbox must not wait for
    /// another behavior: the holder could be waiting on it in turn.
    fn may_wait() -> bool {
        HELD.with(|h| h.get()) == 0 && !Mailbox::current_thread_is_dispatching()
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        HELD.with(|h| h.set(h.get() - 1));
    }
}

struct ActorCore<B> {
    ctx: ActorContext,
    active: AtomicBool,
    handler: RwLock<Option<ExceptionHandler>>,
    behavior: Mutex<B>,
    call: Option<CallFn<B>>,
}

impl<B: Behavior> ActorCore<B> {
    /// Runs a request drained from this actor's mailbox. Only a synchronous
    /// caller can hold the behavior here, and it never waits while holding it.
    fn serve(&self, f: impl FnOnce(&mut B) -> Result<(), ActorError>) -> Result<(), ActorError> {
        let mut behavior = self.behavior.lock();
        let _held = Held::enter();
        f(&mut *behavior)
    }

    fn call_with<R>(&self, f: impl FnOnce(&mut B) -> Result<R, ActorError>) -> Result<R, ActorError> {
        let mut behavior = if Held::may_wait() {
            self.behavior.lock()
        } else {
            self.behavior.try_lock().ok_or_else(|| ActorError::Busy {
                actor: self.ctx.name.to_string(),
            })?
        };
        let _held = Held::enter();
        f(&mut *behavior)
    }
}

impl<B: Behavior> RequestProcessor for ActorCore<B> {
    fn exception_handler(&self) -> Option<ExceptionHandler> {
        self.handler.read().clone()
    }

    fn set_exception_handler(&self, handler: Option<ExceptionHandler>) -> Option<ExceptionHandler> {
        std::mem::replace(&mut *self.handler.write(), handler)
    }

    fn process_request(&self, request: Request) {
        processor::process(&self.ctx.mailbox, &self.ctx.name, request, |payload, responder| {
            self.serve(|b| b.process_request(&self.ctx, payload, responder))
        });
    }
}

/// An actor driven by a [`Behavior`] and served by a [`Mailbox`].
///
/// Several actors may share one mailbox; they are then drained by the same
/// worker and never run concurrently with one another.
pub struct JaActor<B> {
    core: Arc<ActorCore<B>>,
}

impl<B> Clone for JaActor<B> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<B: Behavior> JaActor<B> {
    /// An actor with its own mailbox that does not support calls.
    pub fn new(name: impl Into<Arc<str>>, thread_manager: Arc<dyn ThreadManager>, behavior: B) -> Self {
        Self::on_mailbox(name, Mailbox::new(thread_manager), behavior)
    }

    /// An actor served by an existing, possibly shared, mailbox.
    pub fn on_mailbox(name: impl Into<Arc<str>>, mailbox: Arc<Mailbox>, behavior: B) -> Self {
        Self::build(name.into(), mailbox, behavior, None)
    }

    fn build(name: Arc<str>, mailbox: Arc<Mailbox>, behavior: B, call: Option<CallFn<B>>) -> Self {
        debug!(actor = %name, mailbox = %mailbox.id(), calls = call.is_some(), "Actor created");
        Self {
            core: Arc::new(ActorCore {
                ctx: ActorContext::new(name, mailbox),
                active: AtomicBool::new(false),
                handler: RwLock::new(None),
                behavior: Mutex::new(behavior),
                call,
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.core.ctx.name()
    }

    /// The context this actor's behavior runs with. Requests sent through it
    /// are answered into this actor's mailbox.
    pub fn context(&self) -> &ActorContext {
        &self.core.ctx
    }

    pub fn supports_calls(&self) -> bool {
        self.core.call.is_some()
    }

    fn ensure_active(&self) -> Result<(), ActorError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ActorError::Inactive {
                actor: self.name().to_string(),
            })
        }
    }
}

impl<B: SyncBehavior> JaActor<B> {
    /// An actor with its own mailbox that also answers synchronous calls.
    pub fn with_calls(name: impl Into<Arc<str>>, thread_manager: Arc<dyn ThreadManager>, behavior: B) -> Self {
        Self::with_calls_on_mailbox(name, Mailbox::new(thread_manager), behavior)
    }

    pub fn with_calls_on_mailbox(name: impl Into<Arc<str>>, mailbox: Arc<Mailbox>, behavior: B) -> Self {
        Self::build(name.into(), mailbox, behavior, Some(B::process_call as CallFn<B>))
    }
}

impl<B: Behavior> Actor for JaActor<B> {
    fn mailbox(&self) -> &Arc<Mailbox> {
        self.core.ctx.mailbox()
    }

    fn accept_request_with_handler(
        &self,
        source: &Arc<dyn RequestSource>,
        payload: Payload,
        response_processor: ResponseProcessor,
        handler: Option<ExceptionHandler>,
    ) -> Result<(), ActorError> {
        self.ensure_active()?;
        let processor: Arc<dyn RequestProcessor> = self.core.clone();
        let request = Request::new(Arc::clone(source), processor, payload, response_processor)
            .with_exception_handler(handler);
        source.send(self.mailbox(), request);
        Ok(())
    }

    fn accept_call(&self, _source: &Arc<dyn RequestSource>, payload: Payload) -> Result<Payload, ActorError> {
        self.ensure_active()?;
        let Some(call) = self.core.call else {
            return Err(ActorError::Unsupported {
                kind: payload.type_name(),
            });
        };
        let ctx = &self.core.ctx;
        processor::detached(|| {
            match catch_unwind(AssertUnwindSafe(|| self.core.call_with(|b| call(b, ctx, payload)))) {
                Ok(result) => result,
                Err(panic) => Err(ActorError::from_panic(panic)),
            }
        })
    }
}

impl<B: Behavior> TargetActor for JaActor<B> {
    fn activate(&self) {
        if !self.core.active.swap(true, Ordering::SeqCst) {
            info!(actor = %self.name(), mailbox = %self.mailbox().id(), "Actor activated");
        }
    }

    fn is_active(&self) -> bool {
        self.core.active.load(Ordering::SeqCst)
    }

    fn set_exception_handler(&self, handler: Option<ExceptionHandler>) -> Option<ExceptionHandler> {
        self.core.set_exception_handler(handler)
    }

    fn exception_handler(&self) -> Option<ExceptionHandler> {
        self.core.exception_handler()
    }
}

impl<B> fmt::Debug for JaActor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JaActor")
            .field("name", &self.core.ctx.name)
            .field("mailbox", &self.core.ctx.mailbox.id())
            .field("active", &self.core.active.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Outcome;
    use crate::mock::ManualThreadManager;
    use crate::source::ExternalSource;
    use std::sync::OnceLock;

    struct Counter {
        total: u64,
    }

    impl Behavior for Counter {
        fn process_request(&mut self, _: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
            self.total += request.take::<u64>()?;
            responder.ok(self.total);
            Ok(())
        }
    }

    impl SyncBehavior for Counter {
        fn process_call(&mut self, _: &ActorContext, request: Payload) -> Result<Payload, ActorError> {
            self.total += request.take::<u64>()?;
            Ok(Payload::new(self.total))
        }
    }

    fn external() -> Arc<dyn RequestSource> {
        Arc::new(ExternalSource)
    }

    fn collect(log: &Arc<Mutex<Vec<Outcome>>>) -> ResponseProcessor {
        let log = Arc::clone(log);
        ResponseProcessor::new(move |outcome| log.lock().push(outcome))
    }

    #[test]
    fn test_inactive_actor_rejects_and_queues_nothing() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::with_calls("counter", tm.clone(), Counter { total: 0 });
        let log = Arc::new(Mutex::new(Vec::new()));

        let err = actor
            .accept_request(&external(), Payload::new(1_u64), collect(&log))
            .unwrap_err();
        assert!(matches!(err, ActorError::Inactive { ref actor } if actor == "counter"));

        let err = actor.accept_call(&external(), Payload::new(1_u64)).unwrap_err();
        assert!(matches!(err, ActorError::Inactive { .. }));

        assert!(actor.mailbox().is_empty());
        assert_eq!(tm.pending(), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_activate_is_one_way_and_idempotent() {
        let actor = JaActor::new("counter", ManualThreadManager::new(), Counter { total: 0 });
        assert!(!actor.is_active());
        actor.activate();
        actor.activate();
        assert!(actor.is_active());
    }

    #[test]
    fn test_requests_share_state_with_calls() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::with_calls("counter", tm.clone(), Counter { total: 0 });
        actor.activate();
        let log = Arc::new(Mutex::new(Vec::new()));

        actor.accept_request(&external(), Payload::new(2_u64), collect(&log)).unwrap();
        tm.run_until_idle();
        let sum = actor.accept_call(&external(), Payload::new(3_u64)).unwrap();

        assert_eq!(sum.take::<u64>().unwrap(), 5);
        let first = log.lock().pop().unwrap().unwrap();
        assert_eq!(first.take::<u64>().unwrap(), 2);
    }

    #[test]
    fn test_call_without_capability_is_unsupported() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::new("counter", tm.clone(), Counter { total: 0 });
        actor.activate();
        assert!(!actor.supports_calls());

        let err = actor.accept_call(&external(), Payload::new(String::from("sum"))).unwrap_err();
        assert!(matches!(err, ActorError::Unsupported { kind } if kind == "alloc::string::String"));
        assert!(actor.mailbox().is_empty());
        assert_eq!(tm.pending(), 0);
    }

    #[test]
    fn test_handler_swap_returns_previous() {
        let actor = JaActor::new("counter", ManualThreadManager::new(), Counter { total: 0 });
        let first = ExceptionHandler::recover_with(0_u64);
        let second = ExceptionHandler::recover_with(1_u64);

        assert!(actor.set_exception_handler(Some(first.clone())).is_none());
        let previous = actor.set_exception_handler(Some(second.clone())).unwrap();
        assert!(previous.ptr_eq(&first));
        assert!(actor.exception_handler().unwrap().ptr_eq(&second));

        let restored = actor.set_exception_handler(Some(previous)).unwrap();
        assert!(restored.ptr_eq(&second));
    }

    struct SelfCaller {
        me: Arc<OnceLock<JaActor<SelfCaller>>>,
    }

    impl Behavior for SelfCaller {
        fn process_request(&mut self, ctx: &ActorContext, _: Payload, responder: Responder) -> Result<(), ActorError> {
            let me = self.me.get().ok_or_else(|| ActorError::msg("not wired"))?;
            let busy = matches!(ctx.call(me, ()), Err(ActorError::Busy { .. }));
            responder.ok(busy);
            Ok(())
        }
    }

    impl SyncBehavior for SelfCaller {
        fn process_call(&mut self, _: &ActorContext, _: Payload) -> Result<Payload, ActorError> {
            Ok(Payload::new(()))
        }
    }

    #[test]
    fn test_self_call_while_processing_is_busy() {
        let tm = ManualThreadManager::new();
        let me = Arc::new(OnceLock::new());
        let actor = JaActor::with_calls("narcissus", tm.clone(), SelfCaller { me: Arc::clone(&me) });
        me.set(actor.clone()).unwrap();
        actor.activate();
        let log = Arc::new(Mutex::new(Vec::new()));

        actor.accept_request(&external(), Payload::new(()), collect(&log)).unwrap();
        tm.run_until_idle();

        let busy = log.lock().pop().unwrap().and_then(Payload::take::<bool>).unwrap();
        assert!(busy);
        // Outside of any dispatch the same call goes through.
        assert!(actor.accept_call(&external(), Payload::new(())).is_ok());
    }

    #[test]
    fn test_actors_sharing_a_mailbox_are_drained_together() {
        let tm = ManualThreadManager::new();
        let mailbox = Mailbox::new(tm.clone());
        let a = JaActor::on_mailbox("a", Arc::clone(&mailbox), Counter { total: 0 });
        let b = JaActor::on_mailbox("b", Arc::clone(&mailbox), Counter { total: 100 });
        a.activate();
        b.activate();
        let log = Arc::new(Mutex::new(Vec::new()));

        a.accept_request(&external(), Payload::new(1_u64), collect(&log)).unwrap();
        b.accept_request(&external(), Payload::new(1_u64), collect(&log)).unwrap();
        assert_eq!(tm.pending(), 1);
        assert_eq!(tm.run_until_idle(), 1);

        let totals: Vec<u64> = log
            .lock()
            .drain(..)
            .map(|o| o.and_then(Payload::take::<u64>).unwrap())
            .collect();
        assert_eq!(totals, vec![1, 101]);
    }
}
