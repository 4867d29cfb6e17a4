//! # APC Framework
//!
//! A lightweight actor runtime built on **asynchronous procedure calls**.
//! Actors exchange requests and responses; each actor processes at most one
//! message at a time, while a small pool of worker threads is multiplexed
//! across any number of actors.
//!
//! ## How a request travels
//!
//! ```text
//!  caller ──accept_request──▶ target inbox ──(idle? obtain thread)──▶ worker
//!                                                                       │
//!                         Behavior::process_request(ctx, payload, responder)
//!                                                                       │
//!  caller continuation ◀── originator mailbox ◀── Response ◀── responder
//! ```
//!
//! 1. The caller builds a [`Request`] through [`Actor::accept_request`]. No
//!    application logic runs on the caller's thread.
//! 2. The request lands in the target's [`Mailbox`]. A mailbox that was idle
//!    asks its [`ThreadManager`] for a worker.
//! 3. The worker drains the mailbox in FIFO order. Sends made while draining
//!    are buffered per destination and flushed when the cycle ends.
//! 4. The behavior answers through its [`Responder`]. The response is routed
//!    back through the mailbox that sent the request, so the continuation
//!    runs under the originator's single-worker guarantee.
//!
//! ## Failures
//!
//! Once a call crosses an asynchronous boundary there is no stack to unwind.
//! Failures and panics in a behavior are offered to an [`ExceptionHandler`]:
//! the one attached to the request, else the target's default. Without a
//! handler the error itself becomes the response. A continuation always
//! runs exactly once, with [`ActorError::Dropped`] if the behavior lost its
//! responder.
//!
//! ## Crate layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`actor`] | [`Behavior`], [`SyncBehavior`], [`Actor`], [`TargetActor`], [`JaActor`], [`ActorContext`] |
//! | [`mailbox`] | [`Mailbox`] and its dispatch loop |
//! | [`buffered`] | [`BufferedEventsQueue`] inbox/outbox transport |
//! | [`message`] | [`Request`], [`Response`], [`Message`], [`ResponseProcessor`] |
//! | [`processor`] | [`RequestProcessor`], [`Responder`] |
//! | [`source`] | [`RequestSource`], [`MailboxSource`], [`ExternalSource`] |
//! | [`exception`] | [`ExceptionHandler`] |
//! | [`thread_manager`] | [`ThreadManager`], [`PoolThreadManager`], [`TokioThreadManager`] |
//! | [`client`] | [`Caller`] |
//! | [`system`] | [`ActorSystem`] |
//! | [`config`] | [`RuntimeConfig`] |
//! | [`mock`] | deterministic [`ManualThreadManager`](mock::ManualThreadManager) for tests |

pub mod actor;
pub mod buffered;
pub mod client;
pub mod config;
pub mod error;
pub mod exception;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod payload;
pub mod processor;
pub mod source;
pub mod system;
pub mod thread_manager;
pub mod tracing;

pub use actor::{Actor, ActorContext, Behavior, JaActor, SyncBehavior, TargetActor};
pub use buffered::{BufferedEventsDestination, BufferedEventsQueue};
pub use client::Caller;
pub use config::{ConfigError, RuntimeConfig};
pub use error::ActorError;
pub use exception::ExceptionHandler;
pub use mailbox::{Mailbox, MailboxId};
pub use message::{Message, Outcome, Request, RequestId, Response, ResponseProcessor};
pub use payload::Payload;
pub use processor::{RequestProcessor, Responder};
pub use source::{ExternalSource, MailboxSource, RequestSource};
pub use system::{ActorSystem, SystemError};
pub use thread_manager::{PoolThreadManager, ThreadManager, TokioThreadManager};
