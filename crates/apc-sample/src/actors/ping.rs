use apc_framework::{ActorContext, ActorError, Behavior, JaActor, Payload, Responder, ResponseProcessor};
use tracing::debug;

use crate::actors::Pong;
use crate::model::Ping;

/// Relays each [`Ping`] to a [`Pong`] actor and answers with its reply.
///
/// The reply arrives in a later dispatch cycle of this actor, so the
/// responder is moved into the continuation.
pub struct Pinger {
    pong: JaActor<Pong>,
}

impl Pinger {
    pub fn new(pong: JaActor<Pong>) -> Self {
        Self { pong }
    }
}

impl Behavior for Pinger {
    fn process_request(&mut self, ctx: &ActorContext, request: Payload, responder: Responder) -> Result<(), ActorError> {
        let ping = request.take::<Ping>()?;
        debug!(actor = ctx.name(), seq = ping.seq, to = self.pong.name(), "Relaying ping");
        ctx.send(&self.pong, ping, ResponseProcessor::new(move |outcome| responder.respond(outcome)))
    }
}
