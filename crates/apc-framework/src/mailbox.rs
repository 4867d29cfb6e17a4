//! # Mailbox
//!
//! The serialization point of an actor. A mailbox owns a
//! [`BufferedEventsQueue`] and a two-state machine:
//!
//! ```text
//!   Idle ──(send wins CAS)──▶ Scheduled ──(drain, flush, release)──▶ Idle
//! ```
//!
//! Only the party that wins the `Idle → Scheduled` transition asks the
//! [`ThreadManager`] for a worker, so at most one worker drains a mailbox at
//! any instant. No lock is held while application code runs.
//!
//! After releasing the state the worker checks the inbox once more. A send
//! that raced with the release is therefore either seen by that check or wins
//! the transition itself; a message can never be stranded without a worker.

use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{fence, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use tracing::{error, trace, warn};

use crate::buffered::{BufferedEventsDestination, BufferedEventsQueue};
use crate::error::ActorError;
use crate::message::Message;
use crate::thread_manager::ThreadManager;

const IDLE: u8 = 0;
const SCHEDULED: u8 = 1;

/// Process-wide unique identifier of a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MailboxId(u64);

impl MailboxId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mbx_{}", self.0)
    }
}

thread_local! {
    static DISPATCHING: Cell<Option<MailboxId>> = const { Cell::new(None) };
}

/// Marks the current thread as the dispatching worker of one mailbox and
/// restores the previous marker on drop, so nested drains (a thread manager
/// that runs work inline) unwind correctly.
struct DispatchGuard {
    previous: Option<MailboxId>,
}

impl DispatchGuard {
    fn enter(id: MailboxId) -> Self {
        let previous = DISPATCHING.with(|d| d.replace(Some(id)));
        Self { previous }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(self.previous));
    }
}

/// The buffered inbox/outbox of an actor and its single-worker dispatch loop.
pub struct Mailbox {
    id: MailboxId,
    queue: BufferedEventsQueue<Message>,
    state: AtomicU8,
    thread_manager: Arc<dyn ThreadManager>,
    me: Weak<Mailbox>,
}

impl Mailbox {
    /// Creates an idle mailbox served by `thread_manager`.
    pub fn new(thread_manager: Arc<dyn ThreadManager>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: MailboxId::next(),
            queue: BufferedEventsQueue::new(),
            state: AtomicU8::new(IDLE),
            thread_manager,
            me: me.clone(),
        })
    }

    pub fn id(&self) -> MailboxId {
        self.id
    }

    pub fn thread_manager(&self) -> &Arc<dyn ThreadManager> {
        &self.thread_manager
    }

    pub fn set_initial_buffer_capacity(&self, capacity: usize) {
        self.queue.set_initial_buffer_capacity(capacity);
    }

    /// True when no worker is assigned to this mailbox.
    pub fn is_idle(&self) -> bool {
        self.state.load(Ordering::SeqCst) == IDLE
    }

    /// True when the inbox holds no undelivered messages.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// True when the calling thread is currently draining this mailbox.
    pub fn is_dispatching_on_current_thread(&self) -> bool {
        DISPATCHING.with(|d| d.get()) == Some(self.id)
    }

    /// True when the calling thread is draining any mailbox.
    pub(crate) fn current_thread_is_dispatching() -> bool {
        DISPATCHING.with(|d| d.get().is_some())
    }

    /// Sends `message` to `destination`.
    ///
    /// From inside this mailbox's own dispatch cycle the message is buffered
    /// in the outbox and handed over when the cycle ends. From any other
    /// thread it goes straight to the destination inbox. Never blocks.
    pub fn send(&self, destination: &Arc<Mailbox>, message: Message) {
        if self.is_dispatching_on_current_thread() {
            trace!(mailbox = %self.id, to = %destination.id, kind = message.kind(), "Buffered");
            let destination: Arc<dyn BufferedEventsDestination<Message>> = destination.clone();
            self.queue.send(destination, message);
        } else {
            destination.put_buffered_events(vec![message]);
        }
    }

    fn schedule(&self) {
        if self
            .state
            .compare_exchange(IDLE, SCHEDULED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        match self.me.upgrade() {
            Some(me) => {
                trace!(mailbox = %self.id, "Obtaining thread");
                self.thread_manager.obtain_thread_for(me);
            }
            None => {
                warn!(mailbox = %self.id, "Mailbox dropped with pending messages");
                self.state.store(IDLE, Ordering::SeqCst);
            }
        }
    }

    /// Drains the inbox until empty, then flushes the outbox.
    ///
    /// Called by a [`ThreadManager`] worker after this mailbox was scheduled.
    pub fn dispatch_events(&self) {
        debug_assert_eq!(
            self.state.load(Ordering::SeqCst),
            SCHEDULED,
            "dispatch_events called on a mailbox that was not scheduled"
        );
        loop {
            {
                let _guard = DispatchGuard::enter(self.id);
                let delivered = self.queue.dispatch_events(|message| self.dispatch(message));
                let flushed = self.queue.send_pending_events();
                trace!(mailbox = %self.id, delivered, flushed, "Dispatch cycle complete");
            }

            self.state.store(IDLE, Ordering::SeqCst);
            fence(Ordering::SeqCst);

            if self.queue.is_empty() {
                return;
            }
            if self
                .state
                .compare_exchange(IDLE, SCHEDULED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // A concurrent sender won the transition and obtained a worker.
                return;
            }
        }
    }

    fn dispatch(&self, message: Message) {
        let kind = message.kind();
        let request_id = message.request_id();
        trace!(mailbox = %self.id, %request_id, kind, "Dispatching");

        let result = catch_unwind(AssertUnwindSafe(|| match message {
            Message::Request(request) => {
                let processor = Arc::clone(request.processor());
                processor.process_request(request);
                Ok(())
            }
            Message::Response(response) => response.deliver(),
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(mailbox = %self.id, %request_id, error = %error, "Response continuation failed");
            }
            Err(panic) => {
                let error = ActorError::from_panic(panic);
                error!(mailbox = %self.id, %request_id, kind, error = %error, "Message delivery panicked");
            }
        }
    }
}

impl BufferedEventsDestination<Message> for Mailbox {
    fn put_buffered_events(&self, events: Vec<Message>) {
        self.queue.put(events);
        self.schedule();
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.id)
            .field("idle", &self.is_idle())
            .field("empty", &self.is_empty())
            .finish()
    }
}
