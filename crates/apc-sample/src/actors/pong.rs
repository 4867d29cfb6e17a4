use apc_framework::{ActorContext, ActorError, Behavior, Payload, Responder};
use tracing::debug;

use crate::model::{Ping, PongReply};

/// Answers every [`Ping`] with a [`PongReply`].
#[derive(Debug, Default)]
pub struct Pong {
    served: u32,
}

impl Pong {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Behavior for Pong {
    fn process_request(&mut self, ctx: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
        let ping = request.take::<Ping>()?;
        self.served += 1;
        debug!(actor = ctx.name(), seq = ping.seq, served = self.served, "Ping received");
        responder.ok(PongReply {
            seq: ping.seq,
            by: ctx.name().to_string(),
            served: self.served,
        });
        Ok(())
    }
}
