//! # APC Sample
//!
//! A small application on top of `apc-framework`.
//!
//! - **[actors]**: the behaviors ([`Pong`](actors::Pong), [`Pinger`](actors::Pinger), [`Calculator`](actors::Calculator), [`Batcher`](actors::Batcher), [`Shouter`](actors::Shouter)).
//! - **[model]**: the request and reply types they exchange.
//! - **[clients]**: typed async wrappers that hide the envelope plumbing.
//! - **[lifecycle]**: [`DemoSystem`](lifecycle::DemoSystem), which wires and starts everything.
//!
//! The binary in `main.rs` walks through each scenario once.

pub mod actors;
pub mod clients;
pub mod error;
pub mod lifecycle;
pub mod model;
