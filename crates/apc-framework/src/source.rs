//! # Request Sources
//!
//! The originator side of a request. A source decides how a request reaches
//! its target and how the response finds its way back.
//!
//! - [`MailboxSource`] belongs to an actor. Requests leave through the
//!   actor's mailbox (buffered when sent mid-dispatch) and responses are
//!   routed back into that same mailbox, so the continuation runs under the
//!   originator's single-worker guarantee.
//! - [`ExternalSource`] is used by code that is not an actor. Requests go
//!   straight into the target inbox and the continuation runs on the
//!   target's worker as soon as the response is produced.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, warn};

use crate::buffered::BufferedEventsDestination;
use crate::error::ActorError;
use crate::mailbox::Mailbox;
use crate::message::{Message, Request, Response};

pub trait RequestSource: Send + Sync + 'static {
    /// Sends `request` to the mailbox of its target actor.
    fn send(&self, destination: &Arc<Mailbox>, request: Request);

    /// Routes `response` back to this source. `queue` is the mailbox of the
    /// actor that produced the response.
    fn response_from(&self, queue: &Mailbox, response: Response);
}

/// The request source of an actor, bound to the actor's mailbox.
#[derive(Clone)]
pub struct MailboxSource {
    mailbox: Arc<Mailbox>,
}

impl MailboxSource {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }
}

impl RequestSource for MailboxSource {
    fn send(&self, destination: &Arc<Mailbox>, request: Request) {
        self.mailbox.send(destination, Message::Request(request));
    }

    fn response_from(&self, queue: &Mailbox, response: Response) {
        queue.send(&self.mailbox, Message::Response(response));
    }
}

impl fmt::Debug for MailboxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxSource")
            .field("mailbox", &self.mailbox.id())
            .finish()
    }
}

/// The request source of code running outside any actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalSource;

impl RequestSource for ExternalSource {
    fn send(&self, destination: &Arc<Mailbox>, request: Request) {
        destination.put_buffered_events(vec![Message::Request(request)]);
    }

    fn response_from(&self, queue: &Mailbox, response: Response) {
        let request_id = response.request_id();
        match catch_unwind(AssertUnwindSafe(|| response.deliver())) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(mailbox = %queue.id(), %request_id, error = %error, "Response continuation failed");
            }
            Err(panic) => {
                let error = ActorError::from_panic(panic);
                error!(mailbox = %queue.id(), %request_id, error = %error, "Response continuation panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{RequestId, ResponseProcessor};
    use crate::mock::ManualThreadManager;
    use crate::payload::Payload;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn flag_response(flag: &Arc<AtomicBool>) -> Response {
        let flag = Arc::clone(flag);
        Response::new(
            RequestId::next(),
            Ok(Payload::new(())),
            ResponseProcessor::new(move |_| flag.store(true, Ordering::SeqCst)),
        )
    }

    #[test]
    fn test_mailbox_source_routes_response_to_own_mailbox() {
        let tm = ManualThreadManager::new();
        let origin = Mailbox::new(tm.clone());
        let target = Mailbox::new(tm.clone());
        let source = MailboxSource::new(Arc::clone(&origin));

        let delivered = Arc::new(AtomicBool::new(false));
        source.response_from(&target, flag_response(&delivered));

        assert!(!delivered.load(Ordering::SeqCst));
        assert!(!origin.is_empty());
        assert!(target.is_empty());

        tm.run_until_idle();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_external_source_delivers_immediately() {
        let tm = ManualThreadManager::new();
        let target = Mailbox::new(tm.clone());

        let delivered = Arc::new(AtomicBool::new(false));
        ExternalSource.response_from(&target, flag_response(&delivered));

        assert!(delivered.load(Ordering::SeqCst));
        assert_eq!(tm.pending(), 0);
    }

    #[test]
    fn test_external_continuation_panic_is_contained() {
        let tm = ManualThreadManager::new();
        let target = Mailbox::new(tm);
        let response = Response::new(
            RequestId::next(),
            Ok(Payload::new(())),
            ResponseProcessor::new(|_| panic!("caller continuation")),
        );
        ExternalSource.response_from(&target, response);
    }
}
