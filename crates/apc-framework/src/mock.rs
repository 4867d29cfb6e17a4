//! # Deterministic Thread Manager for Tests
//!
//! [`ManualThreadManager`] never starts a thread. Drain requests are queued
//! and run on the test thread when the test asks for it, which makes every
//! interleaving reproducible.
//!
//! | Feature | ManualThreadManager | PoolThreadManager |
//! |---------|---------------------|-------------------|
//! | **Threads** | the caller's | fixed worker pool |
//! | **Determinism** | 100% | subject to the OS scheduler |
//! | **Use case** | ordering and routing logic | concurrency properties |
//!
//! ```rust
//! use apc_framework::mock::ManualThreadManager;
//! use apc_framework::{ActorContext, ActorError, Behavior, Caller, JaActor, Payload, Responder, TargetActor};
//!
//! struct Echo;
//!
//! impl Behavior for Echo {
//!     fn process_request(
//!         &mut self,
//!         _ctx: &ActorContext,
//!         request: Payload,
//!         responder: Responder,
//!     ) -> Result<(), ActorError> {
//!         responder.respond(Ok(request));
//!         Ok(())
//!     }
//! }
//!
//! let tm = ManualThreadManager::new();
//! let echo = JaActor::new("echo", tm.clone(), Echo);
//! echo.activate();
//!
//! let caller = Caller::new();
//! let (tx, rx) = std::sync::mpsc::channel();
//! caller
//!     .send(&echo, 42_u32, apc_framework::ResponseProcessor::typed::<u32, _>(move |r| {
//!         tx.send(r.unwrap()).unwrap();
//!     }))
//!     .unwrap();
//!
//! // Nothing runs until the test drives the manager.
//! assert!(rx.try_recv().is_err());
//! tm.run_until_idle();
//! assert_eq!(rx.try_recv().unwrap(), 42);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::mailbox::Mailbox;
use crate::thread_manager::ThreadManager;

/// Queues drain requests until the test runs them.
#[derive(Default)]
pub struct ManualThreadManager {
    pending: Mutex<VecDeque<Arc<Mailbox>>>,
    drains: AtomicUsize,
    closed: AtomicBool,
}

impl ManualThreadManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of mailboxes waiting for a worker.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total number of drains run so far.
    pub fn drains(&self) -> usize {
        self.drains.load(Ordering::SeqCst)
    }

    /// Runs the oldest queued drain. Returns `false` when nothing was queued.
    pub fn run_one(&self) -> bool {
        let next = self.pending.lock().pop_front();
        match next {
            Some(mailbox) => {
                mailbox.dispatch_events();
                self.drains.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Runs drains until no mailbox is waiting. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl ThreadManager for ManualThreadManager {
    fn obtain_thread_for(&self, mailbox: Arc<Mailbox>) {
        if self.closed.load(Ordering::SeqCst) {
            warn!(mailbox = %mailbox.id(), "Thread manager closed; drain request dropped");
            return;
        }
        self.pending.lock().push_back(mailbox);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffered::BufferedEventsDestination;
    use crate::message::{Message, RequestId, Response, ResponseProcessor};
    use crate::payload::Payload;

    fn noop() -> Message {
        Message::Response(Response::new(
            RequestId::next(),
            Ok(Payload::new(())),
            ResponseProcessor::ignore(),
        ))
    }

    #[test]
    fn test_nothing_runs_until_driven() {
        let tm = ManualThreadManager::new();
        let a = Mailbox::new(tm.clone());
        let b = Mailbox::new(tm.clone());

        a.put_buffered_events(vec![noop()]);
        b.put_buffered_events(vec![noop()]);
        assert_eq!(tm.pending(), 2);
        assert_eq!(tm.drains(), 0);

        assert_eq!(tm.run_until_idle(), 2);
        assert_eq!(tm.drains(), 2);
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn test_closed_manager_drops_requests() {
        let tm = ManualThreadManager::new();
        tm.close();
        let a = Mailbox::new(tm.clone());
        a.put_buffered_events(vec![noop()]);
        assert_eq!(tm.pending(), 0);
        assert!(!tm.run_one());
    }
}
