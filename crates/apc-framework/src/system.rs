//! # Actor System
//!
//! [`ActorSystem`] owns the thread manager and the runtime configuration. It
//! is the usual entry point: build one, spawn actors through it, address
//! them with its [`Caller`], and shut it down at the end.
//!
//! ```rust
//! use apc_framework::{ActorContext, ActorError, ActorSystem, Behavior, Payload, Responder, RuntimeConfig};
//!
//! struct Greeter;
//!
//! impl Behavior for Greeter {
//!     fn process_request(
//!         &mut self,
//!         _ctx: &ActorContext,
//!         request: Payload,
//!         responder: Responder,
//!     ) -> Result<(), ActorError> {
//!         let name = request.take::<String>()?;
//!         responder.ok(format!("hello {name}"));
//!         Ok(())
//!     }
//! }
//!
//! let config = RuntimeConfig { worker_threads: 2, ..RuntimeConfig::default() };
//! let system = ActorSystem::new(config).unwrap();
//! let greeter = system.spawn("greeter", Greeter).unwrap();
//!
//! let reply: String = system
//!     .caller()
//!     .ask_blocking_as::<String, _, _>(&greeter, String::from("world"))
//!     .unwrap();
//! assert_eq!(reply, "hello world");
//! system.shutdown();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::actor::{Actor, Behavior, JaActor, SyncBehavior, TargetActor};
use crate::client::Caller;
use crate::config::{ConfigError, RuntimeConfig};
use crate::error::ActorError;
use crate::mailbox::Mailbox;
use crate::thread_manager::{PoolThreadManager, ThreadManager};

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker threads: {0}")]
    Spawn(#[from] std::io::Error),
}

pub struct ActorSystem {
    thread_manager: Arc<dyn ThreadManager>,
    config: RuntimeConfig,
    caller: Caller,
    closed: AtomicBool,
}

impl ActorSystem {
    /// Starts a worker pool sized by `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self, SystemError> {
        config.validate()?;
        let pool = PoolThreadManager::with_config(&config)?;
        Ok(Self::with_thread_manager(Arc::new(pool), config))
    }

    /// Uses an existing thread manager, e.g. a
    /// [`TokioThreadManager`](crate::TokioThreadManager) or a
    /// [`ManualThreadManager`](crate::mock::ManualThreadManager).
    pub fn with_thread_manager(thread_manager: Arc<dyn ThreadManager>, config: RuntimeConfig) -> Self {
        Self {
            thread_manager,
            config,
            caller: Caller::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn thread_manager(&self) -> &Arc<dyn ThreadManager> {
        &self.thread_manager
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// A fresh mailbox served by this system, for actors that should share one.
    pub fn new_mailbox(&self) -> Arc<Mailbox> {
        Mailbox::new(Arc::clone(&self.thread_manager))
    }

    /// Creates, sizes and activates an actor with its own mailbox.
    pub fn spawn<B: Behavior>(&self, name: &str, behavior: B) -> Result<JaActor<B>, ActorError> {
        self.ensure_open()?;
        Ok(self.start(JaActor::new(name, Arc::clone(&self.thread_manager), behavior)))
    }

    /// Like [`ActorSystem::spawn`] for actors that also answer synchronous calls.
    pub fn spawn_with_calls<B: SyncBehavior>(&self, name: &str, behavior: B) -> Result<JaActor<B>, ActorError> {
        self.ensure_open()?;
        Ok(self.start(JaActor::with_calls(name, Arc::clone(&self.thread_manager), behavior)))
    }

    /// Spawns an actor on an existing mailbox.
    pub fn spawn_on<B: Behavior>(&self, name: &str, mailbox: &Arc<Mailbox>, behavior: B) -> Result<JaActor<B>, ActorError> {
        self.ensure_open()?;
        Ok(self.start(JaActor::on_mailbox(name, Arc::clone(mailbox), behavior)))
    }

    fn start<B: Behavior>(&self, actor: JaActor<B>) -> JaActor<B> {
        actor.set_initial_buffer_capacity(self.config.initial_buffer_capacity);
        actor.activate();
        actor
    }

    fn ensure_open(&self) -> Result<(), ActorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ActorError::ThreadManagerClosed);
        }
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the thread manager. Mailboxes already handed to workers are
    /// drained; later drain requests are dropped.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down actor system");
        self.thread_manager.close();
    }
}

impl Drop for ActorSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
