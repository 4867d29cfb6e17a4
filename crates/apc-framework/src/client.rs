//! # Caller
//!
//! The bridge for code that is not itself an actor: a `main` function, a
//! tokio task, a test. A [`Caller`] sends requests through an
//! [`ExternalSource`] and turns the response continuation into a
//! `tokio::sync::oneshot` channel that can be awaited or blocked on.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::actor::Actor;
use crate::error::ActorError;
use crate::message::{Outcome, ResponseProcessor};
use crate::payload::Payload;
use crate::source::{ExternalSource, RequestSource};

/// A cheap, cloneable handle for addressing actors from outside.
///
/// * **Async** – [`Caller::ask`] resolves when the target answers.
/// * **Blocking** – [`Caller::ask_blocking`] for plain threads.
/// * **Synchronous calls** – [`Caller::call`] for actors built with calls.
#[derive(Clone)]
pub struct Caller {
    source: Arc<dyn RequestSource>,
}

impl Default for Caller {
    fn default() -> Self {
        Self::new()
    }
}

impl Caller {
    pub fn new() -> Self {
        Self {
            source: Arc::new(ExternalSource),
        }
    }

    pub fn source(&self) -> &Arc<dyn RequestSource> {
        &self.source
    }

    /// Sends `value` to `actor` and runs `response_processor` with the
    /// outcome on the target's worker.
    pub fn send<A, T>(&self, actor: &A, value: T, response_processor: ResponseProcessor) -> Result<(), ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        actor.accept_request(&self.source, Payload::new(value), response_processor)
    }

    fn enqueue<A, T>(&self, actor: &A, value: T) -> Result<oneshot::Receiver<Outcome>, ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        let (respond_to, response) = oneshot::channel();
        self.send(
            actor,
            value,
            ResponseProcessor::new(move |outcome| {
                let _ = respond_to.send(outcome);
            }),
        )?;
        Ok(response)
    }

    pub async fn ask<A, T>(&self, actor: &A, value: T) -> Result<Payload, ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        let response = self.enqueue(actor, value)?;
        response.await.map_err(|_| ActorError::Dropped)?
    }

    /// Like [`Caller::ask`] and downcasts the answer to `R`.
    pub async fn ask_as<R, A, T>(&self, actor: &A, value: T) -> Result<R, ActorError>
    where
        R: Any,
        A: Actor + ?Sized,
        T: Any + Send,
    {
        self.ask(actor, value).await?.take::<R>()
    }

    /// Blocks the current thread until the answer arrives.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn ask_blocking<A, T>(&self, actor: &A, value: T) -> Result<Payload, ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        let response = self.enqueue(actor, value)?;
        response.blocking_recv().map_err(|_| ActorError::Dropped)?
    }

    pub fn ask_blocking_as<R, A, T>(&self, actor: &A, value: T) -> Result<R, ActorError>
    where
        R: Any,
        A: Actor + ?Sized,
        T: Any + Send,
    {
        self.ask_blocking(actor, value)?.take::<R>()
    }

    /// Synchronous call on the current thread.
    pub fn call<A, T>(&self, actor: &A, value: T) -> Result<Payload, ActorError>
    where
        A: Actor + ?Sized,
        T: Any + Send,
    {
        actor.accept_call(&self.source, Payload::new(value))
    }

    pub fn call_as<R, A, T>(&self, actor: &A, value: T) -> Result<R, ActorError>
    where
        R: Any,
        A: Actor + ?Sized,
        T: Any + Send,
    {
        self.call(actor, value)?.take::<R>()
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Caller")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorContext, Behavior, JaActor, TargetActor};
    use crate::mock::ManualThreadManager;
    use crate::processor::Responder;

    struct Doubler;

    impl Behavior for Doubler {
        fn process_request(&mut self, _: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
            responder.ok(request.take::<i32>()? * 2);
            Ok(())
        }
    }

    struct Forgetful;

    impl Behavior for Forgetful {
        fn process_request(&mut self, _: &ActorContext, _: Payload, _: Responder) -> Result<(), ActorError> {
            Ok(())
        }
    }

    #[test]
    fn test_blocking_ask_waits_for_worker() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::new("doubler", tm.clone(), Doubler);
        actor.activate();

        let driver = drive_once(&tm);

        let caller = Caller::new();
        assert_eq!(caller.ask_blocking_as::<i32, _, _>(&actor, 21).unwrap(), 42);
        driver.join().unwrap();
    }

    #[test]
    fn test_mismatched_answer_type() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::new("doubler", tm.clone(), Doubler);
        actor.activate();

        let caller = Caller::new();
        let (tx, rx) = std::sync::mpsc::channel();
        caller
            .send(
                &actor,
                4_i32,
                ResponseProcessor::typed::<String, _>(move |r| {
                    let _ = tx.send(r.is_err());
                }),
            )
            .unwrap();
        tm.run_until_idle();
        assert!(rx.recv().unwrap());
    }

    fn drive_once(tm: &Arc<ManualThreadManager>) -> std::thread::JoinHandle<()> {
        let tm = Arc::clone(tm);
        std::thread::spawn(move || {
            while tm.pending() == 0 {
                std::thread::yield_now();
            }
            tm.run_until_idle();
        })
    }

    #[tokio::test]
    async fn test_async_ask_reports_dropped_responder() {
        let tm = ManualThreadManager::new();
        let actor = JaActor::new("forgetful", tm.clone(), Forgetful);
        actor.activate();

        let driver = drive_once(&tm);
        let err = Caller::new().ask(&actor, ()).await.unwrap_err();
        assert!(matches!(err, ActorError::Dropped));
        driver.join().unwrap();
    }
}
