//! # Typed Clients
//!
//! Thin wrappers that pair a [`Caller`](apc_framework::Caller) with one actor
//! and expose domain methods returning [`DemoError`](crate::error::DemoError).

pub mod actor_client;
pub mod calculator_client;
pub mod ping_client;
pub mod shout_client;

pub use actor_client::ActorClient;
pub use calculator_client::CalculatorClient;
pub use ping_client::PingClient;
pub use shout_client::ShoutClient;
