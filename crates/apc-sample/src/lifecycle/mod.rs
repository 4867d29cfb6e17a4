//! # Demo System Lifecycle
//!
//! [`DemoSystem`] is the conductor of the sample: it starts the runtime,
//! spawns the actors in dependency order, hands out typed clients and shuts
//! everything down at the end.
//!
//! ## Wiring
//!
//! Actors that talk to other actors receive them at construction, so leaves
//! are spawned first:
//!
//! ```text
//!   pong ◀── ping          calculator ◀── batcher          shouter
//! ```
//!
//! Every actor is activated by [`ActorSystem::spawn`] before it is handed to
//! anyone, so no client ever sees an inactive actor.
//!
//! ## Shutdown
//!
//! [`DemoSystem::shutdown`] closes the worker pool. Mailboxes already handed
//! to a worker are drained; anything sent afterwards is dropped.
//!
//! ## Observability
//!
//! Install a subscriber with [`setup_tracing`](apc_framework::tracing::setup_tracing)
//! and run with `RUST_LOG=debug` to watch requests hop between actors.

use apc_framework::{ActorSystem, ExceptionHandler, RuntimeConfig, TargetActor};
use tracing::info;

use crate::actors::{Batcher, Calculator, Pinger, Pong, Shouter};
use crate::clients::{CalculatorClient, PingClient, ShoutClient};
use crate::error::DemoError;

/// The reply the shouter falls back to when a request fails.
pub const SHOUT_FALLBACK: &str = "recovered";

pub struct DemoSystem {
    system: ActorSystem,
    pub ping: PingClient,
    pub calculator: CalculatorClient,
    pub shouter: ShoutClient,
}

impl DemoSystem {
    /// Starts a worker pool from `config` and spawns the sample actors on it.
    pub fn new(config: RuntimeConfig) -> Result<Self, DemoError> {
        let system = ActorSystem::new(config).map_err(|e| DemoError::Startup(e.to_string()))?;
        Self::with_system(system)
    }

    pub fn with_system(system: ActorSystem) -> Result<Self, DemoError> {
        let caller = system.caller().clone();

        let pong = system.spawn("pong", Pong::new())?;
        let ping = system.spawn("ping", Pinger::new(pong))?;

        let calculator = system.spawn_with_calls("calculator", Calculator::default())?;
        let batcher = system.spawn("batcher", Batcher::new(calculator.clone()))?;

        let shouter = system.spawn("shouter", Shouter)?;
        shouter.set_exception_handler(Some(ExceptionHandler::recover_with(SHOUT_FALLBACK.to_string())));

        info!(workers = system.config().worker_threads, "Demo system started");

        Ok(Self {
            ping: PingClient::new(caller.clone(), ping),
            calculator: CalculatorClient::new(caller.clone(), calculator, batcher),
            shouter: ShoutClient::new(caller, shouter),
            system,
        })
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    pub fn shutdown(self) {
        info!("Demo system stopping");
        self.system.shutdown();
    }
}
