//! # Sample Actors
//!
//! | Actor | Shows |
//! |-------|-------|
//! | [`Pong`] | answering a request directly |
//! | [`Pinger`] | forwarding to another actor and answering from the continuation |
//! | [`Calculator`] | shared state served both asynchronously and by synchronous calls |
//! | [`Batcher`] | several requests in flight at once, replies collected in send order |
//! | [`Shouter`] | failures recovered by an exception handler |

pub mod batcher;
pub mod calculator;
pub mod ping;
pub mod pong;
pub mod shouter;

pub use batcher::Batcher;
pub use calculator::Calculator;
pub use ping::Pinger;
pub use pong::Pong;
pub use shouter::Shouter;
